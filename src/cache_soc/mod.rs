pub mod bits;
pub mod cache_soc;
pub mod mem_msg;
pub mod memory;
pub mod port;
pub mod register;
pub mod sram;

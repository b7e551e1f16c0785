pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod syscalls;

pub use interpreter::{step, Interpreter};
pub use memory::Memory;
pub use opcodes::Instruction;

//! Brook Configuration
//!
//! Defines runtime limits for the Brook virtual machine.
//! Configuration specifies constraints only; enforcement is handled by the VM.

/// VM Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of live stack slots
    pub max_stack_size: usize,

    /// Slots reserved up front
    pub initial_stack_capacity: usize,

    /// Instruction budget for one run; `None` runs unbounded
    pub max_instructions: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack_size: 1 << 20,
            initial_stack_capacity: 256,
            max_instructions: None,
        }
    }
}

impl VmConfig {
    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_stack_size(mut self, slots: usize) -> Self {
        self.max_stack_size = slots;
        self
    }

    pub fn with_max_instructions(mut self, budget: u64) -> Self {
        self.max_instructions = Some(budget);
        self
    }
}

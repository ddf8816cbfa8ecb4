//! User-stack opcode handlers: `PSH_DAT` / `POP_DAT`.

use crate::error::Fault;
use crate::state::MachineState;

pub fn psh_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    let value = state.get_data_long(addr)?;
    state.push_user(value)
}

pub fn pop_dat(state: &mut MachineState, addr: i32) -> Result<(), Fault> {
    let value = state.pop_user()?;
    state.put_data_long(addr, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_round_trips() {
        let mut m = MachineState::new(vec![0u8; 8], 16, 8, 16, 0);
        m.put_data_long(0, 123).unwrap();
        psh_dat(&mut m, 0).unwrap();
        pop_dat(&mut m, 1).unwrap();
        assert_eq!(m.get_data_long(1).unwrap(), 123);
    }

    #[test]
    fn pop_from_empty_stack_faults() {
        let mut m = MachineState::new(vec![0u8; 8], 16, 8, 0, 0);
        assert!(matches!(pop_dat(&mut m, 0), Err(Fault::StackBounds)));
    }
}

//! Indirect addressing opcode handlers: `SET_IND`/`IND_DAT` add one
//! level of cell indirection, `SET_IDX`/`IDX_DAT` add a second, indexed level
//! (base cell + index cell). Every intermediate and final cell index is
//! bounds-checked through [`MachineState::get_data_long`]/`put_data_long`, so
//! an out-of-range pointer faults with [`Fault::InvalidAddress`] before any
//! write happens.

use crate::error::Fault;
use crate::state::MachineState;

/// `data[data[dest_ptr]] = data[src]`: the destination address is read
/// indirectly through `dest_ptr`.
pub fn set_ind(state: &mut MachineState, dest_ptr: i32, src: i32) -> Result<(), Fault> {
    let dest = cell_index(state.get_data_long(dest_ptr)?)?;
    let value = state.get_data_long(src)?;
    state.put_data_long(dest, value)
}

/// `data[dest] = data[data[src_ptr]]`: the mirror of [`set_ind`], the source
/// address is read indirectly.
pub fn ind_dat(state: &mut MachineState, dest: i32, src_ptr: i32) -> Result<(), Fault> {
    let src = cell_index(state.get_data_long(src_ptr)?)?;
    let value = state.get_data_long(src)?;
    state.put_data_long(dest, value)
}

/// `data[data[dest_ptr] + data[index]] = data[src]`: two levels of
/// indirection, a base cell and an index cell summed to form the target.
pub fn set_idx(state: &mut MachineState, dest_ptr: i32, index: i32, src: i32) -> Result<(), Fault> {
    let base = state.get_data_long(dest_ptr)?;
    let offset = state.get_data_long(index)?;
    let dest = cell_index(base.checked_add(offset).ok_or(Fault::InvalidAddress)?)?;
    let value = state.get_data_long(src)?;
    state.put_data_long(dest, value)
}

/// `data[dest] = data[data[src_ptr] + data[index]]`: the mirror of [`set_idx`].
pub fn idx_dat(state: &mut MachineState, dest: i32, src_ptr: i32, index: i32) -> Result<(), Fault> {
    let base = state.get_data_long(src_ptr)?;
    let offset = state.get_data_long(index)?;
    let src = cell_index(base.checked_add(offset).ok_or(Fault::InvalidAddress)?)?;
    let value = state.get_data_long(src)?;
    state.put_data_long(dest, value)
}

fn cell_index(value: i64) -> Result<i32, Fault> {
    i32::try_from(value).map_err(|_| Fault::InvalidAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> MachineState {
        MachineState::new(vec![0u8; 8], 80, 32, 32, 0)
    }

    #[test]
    fn set_ind_writes_through_indirection() {
        let mut m = fresh();
        m.put_data_long(0, 5).unwrap(); // dest_ptr -> cell 5
        m.put_data_long(1, 99).unwrap(); // src value
        set_ind(&mut m, 0, 1).unwrap();
        assert_eq!(m.get_data_long(5).unwrap(), 99);
    }

    #[test]
    fn ind_dat_reads_through_indirection() {
        let mut m = fresh();
        m.put_data_long(0, 5).unwrap(); // src_ptr -> cell 5
        m.put_data_long(5, 42).unwrap();
        ind_dat(&mut m, 1, 0).unwrap();
        assert_eq!(m.get_data_long(1).unwrap(), 42);
    }

    #[test]
    fn idx_variants_sum_base_and_index() {
        let mut m = fresh();
        m.put_data_long(0, 3).unwrap(); // base
        m.put_data_long(1, 2).unwrap(); // index
        m.put_data_long(2, 7).unwrap(); // src value
        set_idx(&mut m, 0, 1, 2).unwrap();
        assert_eq!(m.get_data_long(5).unwrap(), 7);

        idx_dat(&mut m, 4, 0, 1).unwrap();
        assert_eq!(m.get_data_long(4).unwrap(), 7);
    }

    #[test]
    fn out_of_bounds_indirect_target_faults() {
        let mut m = fresh();
        m.put_data_long(0, 9999).unwrap();
        m.put_data_long(1, 1).unwrap();
        assert!(matches!(set_ind(&mut m, 0, 1), Err(Fault::InvalidAddress)));
    }
}

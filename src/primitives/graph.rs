// ============================================================================
// spark-bind - Computed Graph
// A store's computed properties and the in-flight setter path
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::error::{Error, Result};
use crate::primitives::computed::ComputedCell;

/// The computed properties declared on one store, in declaration order.
///
/// Also tracks which computed setters are running, so a setter chain that
/// comes back to a property already on the path fails instead of recursing.
#[derive(Default)]
pub struct ComputedGraph {
    cells: RefCell<Vec<Rc<ComputedCell>>>,
    in_flight: RefCell<Vec<String>>,
}

impl ComputedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property, replacing (in place) any property of the same name.
    ///
    /// Returns the replaced cell so the caller can release it.
    pub fn insert(&self, cell: Rc<ComputedCell>) -> Option<Rc<ComputedCell>> {
        let mut cells = self.cells.borrow_mut();
        match cells.iter_mut().find(|existing| existing.name() == cell.name()) {
            Some(slot) => Some(std::mem::replace(slot, cell)),
            None => {
                cells.push(cell);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<ComputedCell>> {
        self.cells
            .borrow()
            .iter()
            .find(|cell| cell.name() == name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.borrow().iter().any(|cell| cell.name() == name)
    }

    pub fn remove(&self, name: &str) -> Option<Rc<ComputedCell>> {
        let mut cells = self.cells.borrow_mut();
        let index = cells.iter().position(|cell| cell.name() == name)?;
        Some(cells.remove(index))
    }

    /// Remove every property, returning the cells.
    pub fn clear(&self) -> Vec<Rc<ComputedCell>> {
        std::mem::take(&mut *self.cells.borrow_mut())
    }

    pub fn names(&self) -> Vec<String> {
        self.cells
            .borrow()
            .iter()
            .map(|cell| cell.name().to_string())
            .collect()
    }

    pub fn cells(&self) -> Vec<Rc<ComputedCell>> {
        self.cells.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // SETTER PATH
    // =========================================================================

    /// Push `name` onto the setter path.
    ///
    /// Fails with [`Error::CircularSetter`] if it is already there; the error
    /// carries the whole path, closed by the repeated name.
    pub fn begin_set(&self, name: &str) -> Result<()> {
        let mut path = self.in_flight.borrow_mut();
        if path.iter().any(|entry| entry == name) {
            let mut chain = path.clone();
            chain.push(name.to_string());
            return Err(Error::CircularSetter {
                name: name.to_string(),
                path: chain.join(" -> "),
            });
        }
        path.push(name.to_string());
        Ok(())
    }

    /// Pop `name` once its setter's writes have been applied.
    pub fn end_set(&self, name: &str) {
        let mut path = self.in_flight.borrow_mut();
        if path.last().is_some_and(|last| last == name) {
            path.pop();
        }
    }

    /// Forget the path, called when the outermost write returns.
    pub fn reset_setter_path(&self) {
        self.in_flight.borrow_mut().clear();
    }

    pub fn setter_path(&self) -> Vec<String> {
        self.in_flight.borrow().clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Flat parameter tensor with shared storage
//!
//! Cloning a `Tensor` is cheap and aliases the same data and gradient
//! buffers, so a model and an optimizer's parameter groups can hold
//! handles to the same parameters. Gradients in this crate are computed
//! analytically by the model and loss implementations.

use ndarray::Array1;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// A 1-D `f32` parameter tensor with an optional gradient buffer.
#[derive(Clone)]
pub struct Tensor {
    data: Rc<RefCell<Array1<f32>>>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from a vector of values
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self {
            data: Rc::new(RefCell::new(Array1::from(data))),
            grad: Rc::new(RefCell::new(None)),
            requires_grad,
        }
    }

    /// Create a zero-filled tensor of the given length
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self::from_vec(vec![0.0; len], requires_grad)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the underlying data
    pub fn data(&self) -> Ref<'_, Array1<f32>> {
        self.data.borrow()
    }

    /// Mutably borrow the underlying data
    pub fn data_mut(&self) -> RefMut<'_, Array1<f32>> {
        self.data.borrow_mut()
    }

    /// Copy the data out as a plain vector
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.borrow().to_vec()
    }

    /// Current gradient, if one has been set
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Replace the gradient buffer
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add into the gradient buffer, initializing it when absent
    pub fn accumulate_grad(&self, grad: &Array1<f32>) {
        let mut cell = self.grad.borrow_mut();
        match cell.as_mut() {
            Some(existing) => *existing = &*existing + grad,
            None => *cell = Some(grad.clone()),
        }
    }

    /// Clear the gradient buffer
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Whether this tensor participates in gradient updates
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("len", &self.len())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_from_vec_and_len() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
        assert_eq!(t.len(), 3);
        assert!(!t.is_empty());
        assert!(t.requires_grad());
    }

    #[test]
    fn test_clone_aliases_storage() {
        let t = Tensor::from_vec(vec![1.0, 2.0], true);
        let alias = t.clone();

        alias.data_mut()[0] = 5.0;
        assert_eq!(t.data()[0], 5.0);
    }

    #[test]
    fn test_clone_aliases_gradient() {
        let t = Tensor::from_vec(vec![1.0, 2.0], true);
        let alias = t.clone();

        t.set_grad(arr1(&[0.5, 0.5]));
        assert!(alias.grad().is_some());

        alias.zero_grad();
        assert!(t.grad().is_none());
    }

    #[test]
    fn test_accumulate_grad() {
        let t = Tensor::from_vec(vec![0.0], true);

        t.accumulate_grad(&arr1(&[1.0]));
        t.accumulate_grad(&arr1(&[2.0]));

        assert_eq!(t.grad().unwrap()[0], 3.0);
    }

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(4, false);
        assert_eq!(t.len(), 4);
        assert!(t.data().iter().all(|&v| v == 0.0));
        assert!(!t.requires_grad());
    }
}

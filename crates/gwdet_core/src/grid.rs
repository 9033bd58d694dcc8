//! Regular multi-dimensional sample grids.
//!
//! A grid is the Cartesian product of per-dimension coordinate axes. Values
//! computed on a grid are stored in a dense flat array with stride-based
//! indexing so that each value's position is determined by its index tuple,
//! independent of the order in which values were computed.

use serde::{Deserialize, Serialize};

/// Uniformly sample `points` values over `[min, max]` inclusive.
pub fn linspace(min: f64, max: f64, points: usize) -> Vec<f64> {
    if points <= 1 {
        return vec![min];
    }
    let step = (max - min) / (points - 1) as f64;
    (0..points).map(|i| min + step * i as f64).collect()
}

/// Per-dimension coordinate axes defining a regular grid.
///
/// Each axis is strictly increasing with at least two points. Immutable once
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    axes: Vec<Vec<f64>>,
}

impl GridAxes {
    /// Create axes from explicit coordinate vectors.
    ///
    /// Returns `None` if any axis has fewer than two points or is not
    /// strictly increasing.
    pub fn new(axes: Vec<Vec<f64>>) -> Option<Self> {
        if axes.is_empty() {
            return None;
        }
        for axis in &axes {
            if axis.len() < 2 {
                return None;
            }
            if axis.windows(2).any(|pair| pair[0] >= pair[1]) {
                return None;
            }
        }
        Some(Self { axes })
    }

    /// Create axes sampling each `(min, max)` bound linearly with
    /// `points_per_axis` points.
    pub fn linear(bounds: &[(f64, f64)], points_per_axis: usize) -> Option<Self> {
        Self::new(
            bounds
                .iter()
                .map(|&(min, max)| linspace(min, max, points_per_axis))
                .collect(),
        )
    }

    /// Get the number of dimensions
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Get the number of points per dimension
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Vec::len).collect()
    }

    /// Get the total number of grid points
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.axes.iter().map(Vec::len).product()
    }

    /// Get the coordinate axis for one dimension
    #[must_use]
    pub fn axis(&self, dim: usize) -> &[f64] {
        &self.axes[dim]
    }

    /// Get the coordinate tuple for an index tuple
    #[must_use]
    pub fn coordinate(&self, indices: &[usize]) -> Vec<f64> {
        indices
            .iter()
            .zip(&self.axes)
            .map(|(&idx, axis)| axis[idx])
            .collect()
    }
}

/// N-dimensional value storage with flat backing array and stride-based
/// indexing.
///
/// Stores values in row-major order where the last dimension varies fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridArray<T> {
    /// The data stored in row-major order
    data: Vec<T>,
    /// Shape of each dimension (e.g., [5, 10, 3] for a 5x10x3 grid)
    shape: Vec<usize>,
    /// Precomputed strides for index calculation
    strides: Vec<usize>,
}

impl<T: Clone> GridArray<T> {
    /// Create a new array with the given shape, filled with the default value.
    pub fn new(shape: Vec<usize>, default: T) -> Self {
        let total_size: usize = shape.iter().product();
        let strides = compute_strides(&shape);
        Self {
            data: vec![default; total_size],
            shape,
            strides,
        }
    }

    /// Create an array from existing data. Data must be in row-major order.
    pub fn from_data(shape: Vec<usize>, data: Vec<T>) -> Option<Self> {
        let total_size: usize = shape.iter().product();
        if data.len() != total_size {
            return None;
        }
        let strides = compute_strides(&shape);
        Some(Self {
            data,
            shape,
            strides,
        })
    }

    /// Get the shape of the array
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the array is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Convert multi-dimensional indices to flat index
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, (&idx, &size)) in indices.iter().zip(&self.shape).enumerate() {
            if idx >= size {
                return None;
            }
            flat += idx * self.strides[i];
        }
        Some(flat)
    }

    /// Get a reference to the value at the given indices
    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.flat_index(indices).map(|i| &self.data[i])
    }

    /// Set the value at the given indices
    pub fn set(&mut self, indices: &[usize], value: T) -> bool {
        if let Some(i) = self.flat_index(indices) {
            self.data[i] = value;
            true
        } else {
            false
        }
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Iterate over all indices in row-major order
    pub fn indices(&self) -> GridIndices {
        grid_indices(&self.shape)
    }
}

impl<T: Clone> std::ops::Index<&[usize]> for GridArray<T> {
    type Output = T;

    fn index(&self, indices: &[usize]) -> &T {
        let flat = self
            .flat_index(indices)
            .unwrap_or_else(|| panic!("index {indices:?} outside grid of shape {:?}", self.shape));
        &self.data[flat]
    }
}

/// Compute strides for row-major order
fn compute_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return Vec::new();
    }
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len() - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Iterate over every index tuple of a grid shape in row-major order.
pub fn grid_indices(shape: &[usize]) -> GridIndices {
    GridIndices {
        shape: shape.to_vec(),
        current: vec![0; shape.len()],
        done: shape.iter().product::<usize>() == 0,
    }
}

/// Iterator over all index tuples of a grid
pub struct GridIndices {
    shape: Vec<usize>,
    current: Vec<usize>,
    done: bool,
}

impl Iterator for GridIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current.clone();

        // Increment indices (row-major: last dimension varies fastest)
        for i in (0..self.shape.len()).rev() {
            self.current[i] += 1;
            if self.current[i] < self.shape[i] {
                break;
            }
            self.current[i] = 0;
            if i == 0 {
                self.done = true;
            }
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let values = linspace(1.0, 3.0, 5);
        assert_eq!(values.len(), 5);
        assert!((values[0] - 1.0).abs() < 1e-12);
        assert!((values[2] - 2.0).abs() < 1e-12);
        assert!((values[4] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_linspace_degenerate() {
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }

    #[test]
    fn test_axes_validation() {
        assert!(GridAxes::new(vec![vec![0.0, 1.0], vec![0.0, 0.5, 1.0]]).is_some());
        // too short
        assert!(GridAxes::new(vec![vec![0.0]]).is_none());
        // not strictly increasing
        assert!(GridAxes::new(vec![vec![0.0, 1.0, 1.0]]).is_none());
        assert!(GridAxes::new(vec![]).is_none());
    }

    #[test]
    fn test_axes_linear_shape() {
        let axes = GridAxes::linear(&[(0.0, 1.0), (10.0, 20.0)], 4).unwrap();
        assert_eq!(axes.ndim(), 2);
        assert_eq!(axes.shape(), vec![4, 4]);
        assert_eq!(axes.total_points(), 16);
        assert!((axes.axis(1)[3] - 20.0).abs() < 1e-12);
        assert_eq!(axes.coordinate(&[0, 3]), vec![0.0, 20.0]);
    }

    #[test]
    fn test_array_row_major_order() {
        let array = GridArray::from_data(vec![2, 3], (0..6).collect()).unwrap();
        assert_eq!(array.flat_index(&[0, 0]), Some(0));
        assert_eq!(array.flat_index(&[0, 2]), Some(2));
        assert_eq!(array.flat_index(&[1, 0]), Some(3));
        assert_eq!(array.get(&[1, 2]), Some(&5));
        assert_eq!(array.flat_index(&[2, 0]), None);
        assert_eq!(array.flat_index(&[0]), None);
    }

    #[test]
    fn test_array_set() {
        let mut array = GridArray::new(vec![2, 2], 0.0);
        assert!(array.set(&[1, 0], 7.0));
        assert_eq!(array[&[1usize, 0][..]], 7.0);
        assert!(!array.set(&[2, 0], 1.0));
        assert!(!array.is_empty());
        assert_eq!(array.len(), 4);
    }

    #[test]
    fn test_indices_iteration_matches_flat_order() {
        let array = GridArray::from_data(vec![2, 2, 2], (0..8).collect()).unwrap();
        for (flat, indices) in array.indices().enumerate() {
            assert_eq!(array.flat_index(&indices), Some(flat));
        }
        assert_eq!(array.indices().count(), 8);
        assert_eq!(grid_indices(&[0, 3]).count(), 0);
    }
}

//! Container types built on tagged buffers
//!
//! ## Core Containers
//!
//! - **`DynArray<T>`** - Growable array using realloc for growth, with
//!   power-of-two or exact capacity policies
//!
//! ## Views
//!
//! - **`View<'a, T>`** / **`ViewMut<'a, T>`** - Non-owning element ranges
//!   over any buffer, array or other view

mod dyn_array;
mod view;

pub use dyn_array::DynArray;
pub use view::{View, ViewMut};

/// Storage for at most one materialized value.
///
/// The presence flag is the `Option` discriminant itself, so an initialized cell always holds
/// a fully constructed `T`. The cell does no synchronization of its own: whoever owns it
/// (a [`Stored`](crate::accessor::Stored) accessor or a [`Lazy`](crate::lazy::Lazy)) decides
/// how it is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackingCell<T> {
    value: Option<T>,
}

impl<T> BackingCell<T> {
    /// Creates an empty, uninitialized cell.
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Creates a cell that is initialized from the start.
    pub const fn with_value(value: T) -> Self {
        Self { value: Some(value) }
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    /// Returns the stored value, if any. Never has side effects.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    /// Stores `value` and marks the cell initialized.
    ///
    /// Any prior value is overwritten and handed back to the caller.
    pub fn set(&mut self, value: T) -> Option<T> {
        self.value.replace(value)
    }

    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

impl<T> Default for BackingCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<T> for BackingCell<T> {
    fn from(value: T) -> Self {
        Self::with_value(value)
    }
}

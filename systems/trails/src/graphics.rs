use std::{fmt, slice};

/// Callback fired whenever a [`GraphicsSet`] changes size.
pub type ResizeObserver = Box<dyn FnMut()>;

/// Observable, resizable collection of opaque drawable handles.
///
/// The set never inspects its elements; it only tracks how many exist and
/// notifies its observer when that number changes.
pub struct GraphicsSet<G> {
    elements: Vec<G>,
    observer: Option<ResizeObserver>,
}

impl<G> GraphicsSet<G> {
    /// Creates an empty set without an observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            observer: None,
        }
    }

    /// Creates an empty set that reports size changes to `observer`.
    #[must_use]
    pub fn with_observer<F>(observer: F) -> Self
    where
        F: FnMut() + 'static,
    {
        let mut set = Self::new();
        set.set_observer(observer);
        set
    }

    /// Registers the size-change callback, replacing any previous one.
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut() + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Grows or shrinks the set to `target` elements.
    ///
    /// Missing elements are built with `factory` and appended; excess elements
    /// are dropped from the end. The observer fires once when the size changed.
    pub fn resize<F>(&mut self, target: usize, mut factory: F)
    where
        F: FnMut() -> G,
    {
        let current = self.elements.len();
        if target == current {
            return;
        }

        if target > current {
            self.elements.reserve(target - current);
            self.elements.extend((current..target).map(|_| factory()));
        } else {
            self.elements.truncate(target);
        }

        if let Some(observer) = self.observer.as_mut() {
            observer();
        }
    }

    /// Number of elements in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Reports whether the set holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&G> {
        self.elements.get(index)
    }

    /// Elements in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[G] {
        &self.elements
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> slice::Iter<'_, G> {
        self.elements.iter()
    }

    /// Iterates mutably over the elements.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, G> {
        self.elements.iter_mut()
    }
}

impl<G> Default for GraphicsSet<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: fmt::Debug> fmt::Debug for GraphicsSet<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsSet")
            .field("elements", &self.elements)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

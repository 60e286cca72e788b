/// Vertical extent of the widget under the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub top: f32,
    pub bottom: f32,
}

impl Bounds {
    pub fn new(top: f32, bottom: f32) -> Self {
        Self { top, bottom }
    }

    /// Offset of the midpoint from `top`.
    pub fn half_height(&self) -> f32 {
        (self.bottom - self.top) / 2.0
    }
}

/// State of one drag gesture, from pointer-down to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub origin_index: usize,
    pub dragged_index: usize,
    pub hover_index: usize,
}

/// Ordered widget handles. Insertion order is render order and a drag only
/// ever permutes the entries.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOrder<W> {
    items: Vec<W>,
    drag: Option<DragSession>,
    before_drag: Option<Vec<W>>,
}

impl<W: Clone> WidgetOrder<W> {
    pub fn new(items: Vec<W>) -> Self {
        Self {
            items,
            drag: None,
            before_drag: None,
        }
    }

    pub fn items(&self) -> &[W] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Relocates one entry: remove at `from`, insert at `to`.
    ///
    /// # Panics
    /// If either index is out of range.
    pub fn move_item(&mut self, from: usize, to: usize) {
        self.check_index(from);
        self.check_index(to);
        if from == to {
            return;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
    }

    /// Starts a gesture for the widget at `index`, replacing any session
    /// that was not ended.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn begin_drag(&mut self, index: usize) {
        self.check_index(index);
        if self.drag.is_none() {
            self.before_drag = Some(self.items.clone());
        }
        self.drag = Some(DragSession {
            origin_index: index,
            dragged_index: index,
            hover_index: index,
        });
    }

    /// Pointer moved over the widget at `over_index`.
    ///
    /// The dragged widget is only moved once the pointer crosses the hovered
    /// widget's midpoint in the drag direction. Returns whether the order
    /// changed.
    ///
    /// # Panics
    /// If `over_index` is out of range.
    pub fn hover(&mut self, over_index: usize, pointer_y: f32, bounds: Bounds) -> bool {
        self.check_index(over_index);
        let Some(session) = self.drag.as_mut() else {
            return false;
        };
        session.hover_index = over_index;
        let dragged = session.dragged_index;
        if over_index == dragged {
            return false;
        }

        let middle = bounds.half_height();
        let offset = pointer_y - bounds.top;
        if dragged < over_index && offset < middle {
            return false;
        }
        if dragged > over_index && offset > middle {
            return false;
        }

        session.dragged_index = over_index;
        let item = self.items.remove(dragged);
        self.items.insert(over_index, item);
        tracing::trace!(from = dragged, to = over_index, "widget moved");
        true
    }

    /// Ends the gesture keeping the current order.
    pub fn end_drag(&mut self) -> Option<DragSession> {
        self.before_drag = None;
        self.drag.take()
    }

    /// Aborts the gesture and restores the order from before it began.
    pub fn cancel_drag(&mut self) -> Option<DragSession> {
        if let Some(items) = self.before_drag.take() {
            self.items = items;
        }
        self.drag.take()
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.items.len(),
            "widget index {index} out of range for {} widgets",
            self.items.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> WidgetOrder<char> {
        WidgetOrder::new(vec!['A', 'B', 'C', 'D'])
    }

    // Every widget spans 100 units, stacked from y = 0.
    fn bounds(index: usize) -> Bounds {
        let top = index as f32 * 100.0;
        Bounds::new(top, top + 100.0)
    }

    #[test]
    fn dragging_past_midpoint_relocates_once() {
        let mut o = order();
        o.begin_drag(0);
        assert!(o.hover(2, 260.0, bounds(2)));
        assert_eq!(o.items(), &['B', 'C', 'A', 'D']);
        assert_eq!(o.drag().map(|d| d.dragged_index), Some(2));
        o.end_drag();
        assert_eq!(o.items(), &['B', 'C', 'A', 'D']);
        assert!(!o.is_dragging());
    }

    #[test]
    fn moving_down_waits_for_midpoint() {
        let mut o = order();
        o.begin_drag(0);
        assert!(!o.hover(1, 140.0, bounds(1)));
        assert_eq!(o.items(), &['A', 'B', 'C', 'D']);
        assert!(o.hover(1, 150.0, bounds(1)));
        assert_eq!(o.items(), &['B', 'A', 'C', 'D']);
    }

    #[test]
    fn moving_up_waits_for_midpoint() {
        let mut o = order();
        o.begin_drag(3);
        assert!(!o.hover(2, 270.0, bounds(2)));
        assert!(o.hover(2, 230.0, bounds(2)));
        assert_eq!(o.items(), &['A', 'B', 'D', 'C']);
        assert!(o.hover(0, 10.0, bounds(0)));
        assert_eq!(o.items(), &['D', 'A', 'B', 'C']);
    }

    #[test]
    fn hovering_self_is_noop() {
        let mut o = order();
        o.begin_drag(1);
        assert!(!o.hover(1, 150.0, bounds(1)));
        assert_eq!(o.items(), &['A', 'B', 'C', 'D']);
    }

    #[test]
    fn hover_without_session_is_ignored() {
        let mut o = order();
        assert!(!o.hover(2, 299.0, bounds(2)));
        assert_eq!(o.items(), &['A', 'B', 'C', 'D']);
    }

    #[test]
    fn cancel_restores_original_order() {
        let mut o = order();
        o.begin_drag(0);
        o.hover(3, 390.0, bounds(3));
        assert_eq!(o.items(), &['B', 'C', 'D', 'A']);
        let session = o.cancel_drag().unwrap();
        assert_eq!(session.origin_index, 0);
        assert_eq!(o.items(), &['A', 'B', 'C', 'D']);
    }

    #[test]
    fn order_stays_a_permutation() {
        let mut o = order();
        o.begin_drag(1);
        for (idx, y) in [(3, 390.0), (0, 5.0), (2, 260.0), (1, 120.0)] {
            o.hover(idx, y, bounds(idx));
        }
        o.end_drag();
        let mut sorted = o.items().to_vec();
        sorted.sort();
        assert_eq!(sorted, vec!['A', 'B', 'C', 'D']);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_index_panics() {
        let mut o = order();
        o.begin_drag(4);
    }

    #[test]
    fn move_item_is_remove_then_insert() {
        let mut o = order();
        o.move_item(3, 0);
        assert_eq!(o.items(), &['D', 'A', 'B', 'C']);
    }
}

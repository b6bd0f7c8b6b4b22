use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    pub width: u32,
    pub height: u32,
    pub png: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailSlot {
    pub slot_index: usize,
    pub center_time: f64,
    pub image: StillImage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn pixel_size(&self, dpr: f32) -> (u32, u32) {
        let dpr = if dpr > 0.0 { dpr } else { 1.0 };
        (
            ((self.width * dpr).ceil() as u32).max(1),
            ((self.height * dpr).ceil() as u32).max(1),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPlan {
    pub slots: usize,
    pub segment_duration: f64,
}

impl SlotPlan {
    /// `slots = max(1, ceil(width / cell_width))`, each covering an equal
    /// share of `duration`.
    pub fn new(duration: f64, width: f64, cell_width: f32) -> Self {
        let slots = if width > 0.0 && cell_width > 0.0 {
            ((width / cell_width as f64).ceil() as usize).max(1)
        } else {
            1
        };
        let segment_duration = if duration > 0.0 {
            duration / slots as f64
        } else {
            0.0
        };
        Self {
            slots,
            segment_duration,
        }
    }

    pub fn center_time(&self, slot_index: usize) -> f64 {
        (slot_index as f64 + 0.5) * self.segment_duration
    }

    pub fn center_times(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.slots).map(|i| (i, self.center_time(i)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filmstrip {
    slots: Vec<Option<ThumbnailSlot>>,
}

impl Filmstrip {
    pub fn with_plan(plan: &SlotPlan) -> Self {
        Self {
            slots: vec![None; plan.slots],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(Option::is_some)
    }

    pub fn insert(&mut self, slot: ThumbnailSlot) -> bool {
        match self.slots.get_mut(slot.slot_index) {
            Some(entry) => {
                *entry = Some(slot);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, slot_index: usize) -> Option<&ThumbnailSlot> {
        self.slots.get(slot_index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&ThumbnailSlot>)> {
        self.slots.iter().enumerate().map(|(i, s)| (i, s.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still() -> StillImage {
        StillImage {
            width: 1,
            height: 1,
            png: Arc::from(vec![0u8; 4]),
        }
    }

    #[test]
    fn plan_rounds_slot_count_up() {
        let plan = SlotPlan::new(90.0, 325.0, 40.0);
        assert_eq!(plan.slots, 9);
        assert!((plan.segment_duration - 10.0).abs() < 1e-12);
        assert!((plan.center_time(0) - 5.0).abs() < 1e-12);
        assert!((plan.center_time(8) - 85.0).abs() < 1e-12);
    }

    #[test]
    fn doubling_width_doubles_slots() {
        assert_eq!(SlotPlan::new(60.0, 400.0, 40.0).slots, 10);
        assert_eq!(SlotPlan::new(60.0, 800.0, 40.0).slots, 20);
    }

    #[test]
    fn narrow_or_unmeasured_width_keeps_one_slot() {
        assert_eq!(SlotPlan::new(10.0, 5.0, 40.0).slots, 1);
        assert_eq!(SlotPlan::new(10.0, 0.0, 40.0).slots, 1);
    }

    #[test]
    fn pixel_size_includes_dpr() {
        let cell = CellSize::new(40.0, 60.0);
        assert_eq!(cell.pixel_size(1.0), (40, 60));
        assert_eq!(cell.pixel_size(2.0), (80, 120));
        assert_eq!(cell.pixel_size(1.5), (60, 90));
        assert_eq!(cell.pixel_size(1.25), (50, 75));
    }

    #[test]
    fn filmstrip_tracks_partial_fill() {
        let plan = SlotPlan::new(30.0, 120.0, 40.0);
        let mut strip = Filmstrip::with_plan(&plan);
        assert_eq!(strip.len(), 3);
        assert!(strip.insert(ThumbnailSlot {
            slot_index: 1,
            center_time: plan.center_time(1),
            image: still(),
        }));
        assert!(!strip.insert(ThumbnailSlot {
            slot_index: 7,
            center_time: 0.0,
            image: still(),
        }));
        assert_eq!(strip.filled(), 1);
        assert!(!strip.is_complete());
        let order: Vec<_> = strip.iter().map(|(i, s)| (i, s.is_some())).collect();
        assert_eq!(order, vec![(0, false), (1, true), (2, false)]);
    }
}

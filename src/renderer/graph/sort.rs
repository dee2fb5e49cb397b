//! Transparency Sorter
//!
//! Alpha blending is order dependent, so translucent instances are drawn
//! farthest first. The sort key is the Euclidean distance from the camera to
//! the instance's world position, recomputed every frame.
//!
//! Instances at exactly the same distance keep their input order (the sort is
//! stable) and none of them is dropped.

use glam::Vec3;

use crate::scene::InstanceId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortedEntry {
    pub instance: InstanceId,
    pub distance: f32,
}

/// Back-to-front draw order for one frame. Keeps its allocation across frames.
#[derive(Debug, Clone, Default)]
pub struct SortedDrawList {
    entries: Vec<SortedEntry>,
}

impl SortedDrawList {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SortedEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SortedEntry> {
        self.entries.iter()
    }

    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.entries.iter().map(|e| e.instance)
    }
}

impl<'a> IntoIterator for &'a SortedDrawList {
    type Item = &'a SortedEntry;
    type IntoIter = std::slice::Iter<'a, SortedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub struct TransparencySorter;

impl TransparencySorter {
    /// Rebuilds `out` from `(instance, world position)` pairs, ordered by
    /// non-increasing distance to `camera_position`.
    pub fn sort_into(
        camera_position: Vec3,
        items: impl IntoIterator<Item = (InstanceId, Vec3)>,
        out: &mut SortedDrawList,
    ) {
        out.entries.clear();
        out.entries.extend(items.into_iter().map(|(instance, position)| SortedEntry {
            instance,
            distance: camera_position.distance(position),
        }));
        // sort_by 是稳定排序：等距物体保持输入顺序
        out.entries.sort_by(|a, b| b.distance.total_cmp(&a.distance));
    }

    #[must_use]
    pub fn sort(
        camera_position: Vec3,
        items: impl IntoIterator<Item = (InstanceId, Vec3)>,
    ) -> SortedDrawList {
        let mut list = SortedDrawList::default();
        Self::sort_into(camera_position, items, &mut list);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<InstanceId> {
        let mut keys: SlotMap<InstanceId, ()> = SlotMap::with_key();
        (0..n).map(|_| keys.insert(())).collect()
    }

    #[test]
    fn orders_farthest_first() {
        let id = ids(4);
        let items = [
            (id[0], Vec3::new(0.0, 0.0, -2.0)),
            (id[1], Vec3::new(0.0, 0.0, -5.0)),
            (id[2], Vec3::new(0.0, 0.0, -1.0)),
            (id[3], Vec3::new(0.0, 0.0, -8.0)),
        ];
        let list = TransparencySorter::sort(Vec3::ZERO, items);
        let distances: Vec<f32> = list.iter().map(|e| e.distance).collect();
        assert_eq!(distances, [8.0, 5.0, 2.0, 1.0]);
        assert_eq!(list.instances().collect::<Vec<_>>(), [id[3], id[1], id[0], id[2]]);
    }

    #[test]
    fn equal_distances_are_kept_in_input_order() {
        let id = ids(3);
        let items = [
            (id[0], Vec3::new(3.0, 0.0, 0.0)),
            (id[1], Vec3::new(0.0, 3.0, 0.0)),
            (id[2], Vec3::new(0.0, 0.0, 3.0)),
        ];
        let list = TransparencySorter::sort(Vec3::ZERO, items);
        assert_eq!(list.len(), 3);
        assert_eq!(list.instances().collect::<Vec<_>>(), id);
    }

    #[test]
    fn empty_input_gives_empty_list() {
        let list = TransparencySorter::sort(Vec3::ONE, std::iter::empty());
        assert!(list.is_empty());
    }

    #[test]
    fn rebuild_replaces_previous_frame() {
        let id = ids(2);
        let mut list = SortedDrawList::with_capacity(4);
        let items = [(id[0], Vec3::X), (id[1], Vec3::X * 2.0)];
        TransparencySorter::sort_into(Vec3::ZERO, items, &mut list);
        TransparencySorter::sort_into(Vec3::X * 2.0, items, &mut list);
        assert_eq!(list.instances().collect::<Vec<_>>(), [id[0], id[1]]);
        assert_eq!(list.as_slice()[1].distance, 0.0);
    }

    /// Every sequence of up to four instances over a small position set,
    /// which has plenty of exact ties.
    #[test]
    fn every_small_set_is_sorted_far_to_near_and_stable() {
        const POSITIONS: [Vec3; 5] = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::NEG_Z,
            Vec3::ZERO,
        ];
        let base = POSITIONS.len();
        let id = ids(4);

        for camera in [Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)] {
            for len in 1..=4u32 {
                for code in 0..base.pow(len) {
                    let items: Vec<_> = (0..len)
                        .map(|i| (id[i as usize], POSITIONS[code / base.pow(i) % base]))
                        .collect();
                    let list = TransparencySorter::sort(camera, items.iter().copied());
                    let input_index =
                        |instance: InstanceId| id.iter().position(|&k| k == instance);

                    assert_eq!(list.len(), items.len());
                    let mut seen: Vec<_> = list.instances().filter_map(input_index).collect();
                    seen.sort_unstable();
                    assert_eq!(seen, (0..items.len()).collect::<Vec<_>>());

                    for pair in list.as_slice().windows(2) {
                        assert!(pair[0].distance >= pair[1].distance, "{items:?}");
                        if pair[0].distance == pair[1].distance {
                            assert!(input_index(pair[0].instance) < input_index(pair[1].instance));
                        }
                    }
                }
            }
        }
    }
}

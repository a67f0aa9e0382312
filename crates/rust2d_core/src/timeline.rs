//! Transient timeline
//!
//! Groups of entities scheduled for removal at a future simulation time,
//! kept sorted by expiry so a tick only inspects the front of the list.

/// One scheduled removal
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineRecord<K> {
    /// Simulation time the group is removed at
    pub end_time: f64,
    /// Simulation time the record was created; start of the fade
    pub fade_start: f64,
    /// Whether members fade out until `end_time`
    pub fading: bool,
    pub group: Vec<K>,
}

impl<K> TimelineRecord<K> {
    /// Opacity of the group's members at `now`
    pub fn opacity_at(&self, now: f64) -> f32 {
        fade_opacity(self.fade_start, self.end_time, now)
    }
}

/// Linear fade from 1 at `fade_start` to 0 at `end_time`
pub fn fade_opacity(fade_start: f64, end_time: f64, now: f64) -> f32 {
    let span = end_time - fade_start;
    if span <= 0.0 {
        return 0.0;
    }
    ((end_time - now).max(0.0) / span).clamp(0.0, 1.0) as f32
}

/// Removal records sorted by ascending expiry
#[derive(Clone, Debug)]
pub struct Timeline<K> {
    records: Vec<TimelineRecord<K>>,
}

impl<K> Default for Timeline<K> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<K: Copy + PartialEq> Timeline<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `group` for removal at `now + duration`.
    ///
    /// Members already scheduled elsewhere are moved to the new record. Records
    /// with equal expiry keep their insertion order.
    pub fn insert(&mut self, group: Vec<K>, now: f64, duration: f64, fading: bool) {
        for &key in &group {
            self.remove_entity(key);
        }
        if group.is_empty() {
            return;
        }
        let end_time = now + duration;
        let index = self
            .records
            .iter()
            .position(|r| r.end_time > end_time)
            .unwrap_or(self.records.len());
        self.records.insert(index, TimelineRecord { end_time, fade_start: now, fading, group });
    }

    /// Unschedule one entity; empty records are dropped
    pub fn remove_entity(&mut self, key: K) -> bool {
        let mut found = false;
        for record in &mut self.records {
            let before = record.group.len();
            record.group.retain(|&k| k != key);
            found |= record.group.len() != before;
        }
        self.records.retain(|r| !r.group.is_empty());
        found
    }

    /// Take every record whose expiry is at or before `now`
    pub fn pop_expired(&mut self, now: f64) -> Vec<TimelineRecord<K>> {
        let count = self.records.iter().take_while(|r| r.end_time <= now).count();
        self.records.drain(..count).collect()
    }

    pub fn contains(&self, key: K) -> bool {
        self.records.iter().any(|r| r.group.contains(&key))
    }

    /// Record holding `key`, if scheduled
    pub fn record_of(&self, key: K) -> Option<&TimelineRecord<K>> {
        self.records.iter().find(|r| r.group.contains(&key))
    }

    pub fn records(&self) -> &[TimelineRecord<K>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

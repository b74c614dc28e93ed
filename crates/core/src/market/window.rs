use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{CommonSnapshot, PriceSnapshot};
use crate::Timestamp;

/// Identifies one per-asset series of a [`PriceSnapshot`].
///
/// A single field-parameterized accessor replaces a family of
/// per-field methods; see [`PriceWindow::row`] and [`PriceWindow::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Ret,
    AdjOpen,
    AdjHigh,
    AdjLow,
    AdjClose,
    AdjRet,
}

/// Fixed-capacity, oldest-evicted look-back window over price snapshots.
///
/// One window is owned per feed by the synchronizer. Consumers address
/// history with negative offsets: `-1` is the latest accepted tick, `-2`
/// the one before, down to `-capacity`.
///
/// Pushing a real snapshot computes its simple returns against the previous
/// snapshot's close (raw and adjusted); placeholders carry zeroed data so
/// returns across a gap degrade to zero rather than propagating garbage.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    assets: usize,
    capacity: usize,
    buf: VecDeque<PriceSnapshot>,
}

impl PriceWindow {
    pub fn new(assets: usize, capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be at least 1");
        Self {
            assets,
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    pub fn assets(&self) -> usize {
        self.assets
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Timestamp of the latest accepted tick.
    pub fn time(&self) -> Option<Timestamp> {
        self.buf.back().map(|s| s.time)
    }

    pub fn latest(&self) -> Option<&PriceSnapshot> {
        self.buf.back()
    }

    /// Accept a real snapshot, computing returns vs the previous close.
    pub fn push(&mut self, mut snap: PriceSnapshot) {
        if let Some(prev) = self.buf.back() {
            for i in 0..self.assets {
                let last_close = prev.raw.close[i];
                snap.raw.ret[i] = if last_close != 0.0 {
                    snap.raw.close[i] / last_close - 1.0
                } else {
                    0.0
                };
                let last_adj_close = prev.adj.close[i];
                snap.adj.ret[i] = if last_adj_close != 0.0 {
                    snap.adj.close[i] / last_adj_close - 1.0
                } else {
                    0.0
                };
            }
        }
        self.push_evicting(snap);
    }

    /// Accept a "no update this tick" marker, keeping indices aligned with
    /// windows of feeds that did advance.
    pub fn push_placeholder(&mut self, time: Timestamp) {
        self.push_evicting(PriceSnapshot::placeholder(self.assets, time));
    }

    fn push_evicting(&mut self, snap: PriceSnapshot) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(snap);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Map a negative offset (`-1` = latest) to a buffer index.
    fn index(&self, offset: isize) -> usize {
        let idx = self.buf.len() as isize + offset;
        assert!(
            (0..self.buf.len() as isize).contains(&idx),
            "window offset {} out of range (len {})",
            offset,
            self.buf.len()
        );
        idx as usize
    }

    pub fn snapshot(&self, offset: isize) -> &PriceSnapshot {
        &self.buf[self.index(offset)]
    }

    /// Whole per-asset series of one field at one look-back offset.
    pub fn row(&self, field: Field, offset: isize) -> &[f64] {
        let snap = self.snapshot(offset);
        match field {
            Field::Open => &snap.raw.open,
            Field::High => &snap.raw.high,
            Field::Low => &snap.raw.low,
            Field::Close => &snap.raw.close,
            Field::Ret => &snap.raw.ret,
            Field::AdjOpen => &snap.adj.open,
            Field::AdjHigh => &snap.adj.high,
            Field::AdjLow => &snap.adj.low,
            Field::AdjClose => &snap.adj.close,
            Field::AdjRet => &snap.adj.ret,
        }
    }

    /// Single cell: one field, one look-back offset, one asset.
    pub fn value(&self, field: Field, offset: isize, asset: usize) -> f64 {
        self.row(field, offset)[asset]
    }

    /// One asset's field across the whole retained window, oldest first.
    pub fn column(&self, field: Field, asset: usize) -> Vec<f64> {
        (0..self.buf.len())
            .map(|i| self.row(field, i as isize - self.buf.len() as isize)[asset])
            .collect()
    }

    pub fn volume(&self, offset: isize, asset: usize) -> i64 {
        self.snapshot(offset).volume[asset]
    }

    pub fn is_valid(&self, offset: isize, asset: usize) -> bool {
        self.snapshot(offset).valid[asset]
    }

    /// Named numeric side-channel at one look-back offset.
    pub fn num(&self, name: &str, offset: isize) -> Option<&[f64]> {
        self.snapshot(offset)
            .extra_num
            .get(name)
            .map(Vec::as_slice)
    }

    /// Named string side-channel at one look-back offset.
    pub fn text(&self, name: &str, offset: isize) -> Option<&[String]> {
        self.snapshot(offset)
            .extra_str
            .get(name)
            .map(Vec::as_slice)
    }
}

/// Look-back window over common (non-price) snapshots.
#[derive(Debug, Clone)]
pub struct CommonWindow {
    capacity: usize,
    buf: VecDeque<CommonSnapshot>,
}

impl CommonWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be at least 1");
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn latest(&self) -> Option<&CommonSnapshot> {
        self.buf.back()
    }

    pub fn push(&mut self, snap: CommonSnapshot) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(snap);
    }

    pub fn push_placeholder(&mut self, time: Timestamp) {
        self.push(CommonSnapshot::placeholder(time));
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn snapshot(&self, offset: isize) -> &CommonSnapshot {
        let idx = self.buf.len() as isize + offset;
        assert!(
            (0..self.buf.len() as isize).contains(&idx),
            "window offset {} out of range (len {})",
            offset,
            self.buf.len()
        );
        &self.buf[idx as usize]
    }

    pub fn num(&self, name: &str, offset: isize) -> Option<f64> {
        self.snapshot(offset).num.get(name).copied()
    }

    pub fn text(&self, name: &str, offset: isize) -> Option<&str> {
        self.snapshot(offset).text.get(name).map(String::as_str)
    }
}

// Copyright 2025 Cowboy AI, LLC.

//! Position arithmetic
//!
//! Shared range-resolution algorithm translating `(gt, lte, desc, limit)`
//! query parameters into a concrete read request against the store's
//! native "read N items starting at position P, forward or backward"
//! primitive. Resolution happens in version space; the start position is
//! converted to the store's zero-based stream position at the edge.

/// Range parameters for [`crate::aggregate::AggregateRecorder::select_range`]:
/// an exclusive lower bound, an inclusive upper bound, a direction and a
/// result limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadRange {
    /// Exclusive lower version bound
    pub gt: Option<u64>,

    /// Inclusive upper version bound
    pub lte: Option<u64>,

    /// Read in descending version order
    pub desc: bool,

    /// Maximum number of events to return
    pub limit: Option<u64>,
}

impl ReadRange {
    /// Whole stream in ascending order.
    pub fn all() -> Self {
        Self::default()
    }

    /// The `n` most recent events, descending.
    pub fn latest(n: u64) -> Self {
        Self {
            desc: true,
            limit: Some(n),
            ..Self::default()
        }
    }
}

/// A resolved read request, or proof that no read is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadPlan {
    /// The range is provably empty; skip the network call
    Empty,
    /// Issue a stream read
    Read {
        /// Store stream position to start at; `None` is unbounded
        start: Option<u64>,
        /// Read backwards from `start` (or from the stream end)
        backwards: bool,
        /// Maximum number of records; `None` is unbounded
        limit: Option<u64>,
    },
}

/// Whether resolving this range requires the stream's current head version.
/// Only bounded descending reads do.
pub(crate) fn needs_head(range: &ReadRange) -> bool {
    range.desc && (range.lte.is_some() || range.gt.is_some())
}

/// Resolve range parameters into a read plan.
///
/// `head` is the stream's current head version, pre-fetched by the caller
/// when [`needs_head`] says so; `None` there means the stream does not
/// exist, which resolves bounded descending reads to [`ReadPlan::Empty`].
pub(crate) fn resolve(range: &ReadRange, initial_version: u64, head: Option<u64>) -> ReadPlan {
    let ReadRange {
        gt,
        lte,
        desc,
        mut limit,
    } = *range;

    let cap = |natural: u64, limit: &mut Option<u64>| {
        *limit = Some(limit.map_or(natural, |l| l.min(natural)));
    };

    let mut start_version: Option<u64> = None;
    if !desc {
        if let Some(gt) = gt {
            start_version = Some(gt.saturating_add(1));
            if let Some(lte) = lte {
                cap(lte.saturating_sub(gt), &mut limit);
            }
        } else if let Some(lte) = lte {
            cap(lte.saturating_add(1).saturating_sub(initial_version), &mut limit);
        }
    } else if let Some(lte) = lte {
        let Some(head) = head else {
            return ReadPlan::Empty;
        };
        let clamped = head.min(lte);
        if clamped < initial_version {
            return ReadPlan::Empty;
        }
        start_version = Some(clamped);
        if let Some(gt) = gt {
            cap(clamped.saturating_sub(gt), &mut limit);
        }
    } else if let Some(gt) = gt {
        let Some(head) = head else {
            return ReadPlan::Empty;
        };
        cap(head.saturating_sub(gt), &mut limit);
    }

    if limit == Some(0) {
        return ReadPlan::Empty;
    }
    ReadPlan::Read {
        start: start_version.map(|v| v.saturating_sub(initial_version)),
        backwards: desc,
        limit,
    }
}

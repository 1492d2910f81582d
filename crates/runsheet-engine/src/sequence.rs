//! Computing item start times.
//!
//! A [`Sequence`] is built once per schedule snapshot. Iterating it walks the
//! items in position order with a cursor that starts at the anchored schedule
//! start (plus setup time, if any) and advances by each item's length.
//! Skipped items advance the cursor like any other; they are only dropped
//! from [`Sequence::active`], after their times are known.

use chrono::{DateTime, FixedOffset};

use crate::anchor::AnchoredStart;
use crate::error::Result;
use crate::model::{Item, Schedule};

/// One item paired with its computed start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledItem<'a> {
    pub item: &'a Item,
    /// Zero-based position in the ordered item list.
    pub index: usize,
    /// Absolute start, carrying the offset fixed at anchoring.
    pub scheduled: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl ScheduledItem<'_> {
    /// When this item ends (the next item's start).
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }
}

/// The timing plan of one schedule snapshot.
#[derive(Debug, Clone)]
pub struct Sequence<'a> {
    anchor: AnchoredStart,
    items: Vec<&'a Item>,
    /// Post-setup start, then the end of every item in order.
    timeline: Vec<DateTime<FixedOffset>>,
}

impl<'a> Sequence<'a> {
    /// Anchor the schedule start and compute every item's start in position
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`RunsheetError::InvalidTimezone`](crate::RunsheetError::InvalidTimezone)
    /// if the schedule's zone is unknown, or
    /// [`RunsheetError::InvalidDuration`](crate::RunsheetError::InvalidDuration)
    /// if the schedule runs past the representable datetime range.
    pub fn new(schedule: &'a Schedule) -> Result<Self> {
        let anchor = schedule.anchored_start()?;
        let items = schedule.ordered_items();

        let mut cursor = anchor.instant();
        if let Some(setup) = schedule.setup_time {
            cursor = setup.to_interval().add_to(cursor)?;
        }
        let mut timeline = Vec::with_capacity(items.len() + 1);
        timeline.push(cursor);
        for item in &items {
            cursor = item.length.to_interval().add_to(cursor)?;
            timeline.push(cursor);
        }

        tracing::debug!(
            schedule = %schedule.id,
            items = items.len(),
            setup_seconds = schedule.setup_time.map(|t| t.to_seconds()),
            end = %cursor.to_rfc3339(),
            "built schedule sequence"
        );

        Ok(Self {
            anchor,
            items,
            timeline,
        })
    }

    pub fn anchor(&self) -> &AnchoredStart {
        &self.anchor
    }

    /// Where the first item starts: the anchored start plus setup time.
    pub fn first_start(&self) -> DateTime<FixedOffset> {
        self.timeline
            .first()
            .copied()
            .unwrap_or_else(|| self.anchor.instant())
    }

    /// Every item with its start, in order. Each call starts from scratch.
    pub fn iter(&self) -> ScheduledItems<'a, '_> {
        ScheduledItems {
            items: self.items.iter(),
            spans: self.timeline.windows(2),
            index: 0,
        }
    }

    /// Items that are not skipped, with the starts computed by [`Sequence::iter`].
    pub fn active(&self) -> impl Iterator<Item = ScheduledItem<'a>> + '_ {
        self.iter().filter(|entry| !entry.item.skipped)
    }

    /// Either every item or only active ones.
    pub fn entries(&self, include_inactive: bool) -> Vec<ScheduledItem<'a>> {
        self.iter()
            .filter(|entry| include_inactive || !entry.item.skipped)
            .collect()
    }

    /// When the last item ends. With no items this is [`Sequence::first_start`].
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.timeline
            .last()
            .copied()
            .unwrap_or_else(|| self.anchor.instant())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, 's> IntoIterator for &'s Sequence<'a> {
    type Item = ScheduledItem<'a>;
    type IntoIter = ScheduledItems<'a, 's>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`Sequence::iter`].
#[derive(Debug, Clone)]
pub struct ScheduledItems<'a, 's> {
    items: std::slice::Iter<'s, &'a Item>,
    spans: std::slice::Windows<'s, DateTime<FixedOffset>>,
    index: usize,
}

impl<'a> Iterator for ScheduledItems<'a, '_> {
    type Item = ScheduledItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let item: &'a Item = *self.items.next()?;
        let (scheduled, end) = match self.spans.next()? {
            [scheduled, end] => (*scheduled, *end),
            _ => return None,
        };
        let entry = ScheduledItem {
            item,
            index: self.index,
            scheduled,
            end,
        };
        self.index += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for ScheduledItems<'_, '_> {}

// ── Tests ───────────────────────────────────────────────────────────────────

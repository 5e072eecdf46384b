//! Display geometry and the render buffers sized from it.
//!
//! [`RenderBuffers`] holds the outgoing cell image and the image last sent
//! to the device.  Both are always exactly `text_columns × text_rows` long;
//! [`RenderBuffers::reallocate`] resizes them together.

use std::ops::Range;

use super::model::DeviceModel;

/// The current shape of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub text_columns: u8,
    pub text_rows: u8,
    pub status_cells: u8,
    pub help_page: u8,
}

impl Geometry {
    /// The geometry a model reports before any reconfiguration.
    pub fn of_model(model: &DeviceModel) -> Self {
        Self {
            text_columns: model.text_columns,
            text_rows: DeviceModel::TEXT_ROWS,
            status_cells: model.status_cells,
            help_page: model.help_page,
        }
    }

    /// Number of text cells (`columns × rows`).
    pub fn text_cells(&self) -> usize {
        usize::from(self.text_columns) * usize::from(self.text_rows)
    }
}

/// Current and previous cell images.
#[derive(Debug, Default)]
pub struct RenderBuffers {
    current: Vec<u8>,
    previous: Vec<u8>,
    previous_status: Vec<u8>,
}

impl RenderBuffers {
    pub fn for_geometry(geometry: &Geometry) -> Self {
        let mut buffers = Self::default();
        buffers.reallocate(geometry);
        buffers
    }

    /// Resizes every buffer to `geometry`.  Previous images are cleared, so
    /// callers must force a full rewrite afterwards.
    pub fn reallocate(&mut self, geometry: &Geometry) {
        let cells = geometry.text_cells();
        self.current = vec![0; cells];
        self.previous = vec![0; cells];
        self.previous_status = vec![0; usize::from(geometry.status_cells)];
    }

    pub fn text_len(&self) -> usize {
        self.previous.len()
    }

    pub fn status_len(&self) -> usize {
        self.previous_status.len()
    }

    /// Stores `cells` as the new window image and returns the span that
    /// must be sent, or `None` when nothing changed.
    ///
    /// Missing cells are treated as blank and surplus cells are ignored.
    /// With `full` set the whole window is returned regardless of the diff.
    pub fn update_window(&mut self, cells: &[u8], full: bool) -> Option<(usize, &[u8])> {
        let len = self.previous.len();
        let cell = |index: usize| cells.get(index).copied().unwrap_or(0);

        let span = if full {
            if len == 0 {
                return None;
            }
            0..len
        } else {
            let first = (0..len).find(|&index| self.previous[index] != cell(index))?;
            let last = (first..len).rev().find(|&index| self.previous[index] != cell(index)).unwrap_or(first);
            first..last + 1
        };

        for index in span.clone() {
            let value = cell(index);
            self.previous[index] = value;
            self.current[index] = value;
        }

        let Range { start, end } = span;
        Some((start, &self.current[start..end]))
    }

    /// Stores the status cells and reports whether they differ from the
    /// last ones sent.
    pub fn update_status(&mut self, cells: &[u8]) -> bool {
        let len = self.previous_status.len();
        let changed = (0..len).any(|index| self.previous_status[index] != cells.get(index).copied().unwrap_or(0));
        if changed {
            for (index, slot) in self.previous_status.iter_mut().enumerate() {
                *slot = cells.get(index).copied().unwrap_or(0);
            }
        }
        changed
    }

    /// The status image last stored by [`update_status`](Self::update_status).
    pub fn status(&self) -> &[u8] {
        &self.previous_status
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

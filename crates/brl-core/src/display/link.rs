//! Per-connection device state shared by every protocol decoder.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::DisplayError;
use crate::domain::geometry::{Geometry, RenderBuffers};
use crate::domain::model::DeviceModel;
use crate::protocol::packets::{cells_packet, hid_cells_packet, CellConfiguration};
use crate::protocol::variant::ProtocolVariant;
use crate::protocol::hex;
use crate::transport::Transport;

/// The transport plus everything the decoders mutate on the device's behalf.
pub(crate) struct Link {
    pub transport: Box<dyn Transport>,
    pub variant: ProtocolVariant,
    pub model: &'static DeviceModel,
    pub geometry: Geometry,
    pub buffers: RenderBuffers,
    /// The next window write sends every cell.
    pub rewrite_required: bool,
    /// The geometry changed; the caller must redraw from scratch.
    pub resize_required: bool,
    pub write_delay: Duration,
    rewrite_interval: Option<Duration>,
    rewrite_time: Instant,
}

impl Link {
    pub fn new(
        transport: Box<dyn Transport>,
        variant: ProtocolVariant,
        model: &'static DeviceModel,
        rewrite_interval: Option<Duration>,
    ) -> Self {
        let mut link = Self {
            transport,
            variant,
            model,
            geometry: Geometry::default(),
            buffers: RenderBuffers::default(),
            rewrite_required: true,
            resize_required: false,
            write_delay: Duration::ZERO,
            rewrite_interval,
            rewrite_time: Instant::now(),
        };
        link.set_default_configuration(model);
        link
    }

    /// Adopts `model` and its default geometry.
    pub fn set_default_configuration(&mut self, model: &'static DeviceModel) {
        info!(
            "detected Alva {}: {} columns, {} status cells",
            model.name, model.text_columns, model.status_cells
        );
        self.model = model;
        self.geometry = Geometry::of_model(model);
        self.buffers.reallocate(&self.geometry);
        self.rewrite_required = true;
        self.rewrite_time = Instant::now();
    }

    /// Applies a reported geometry.  Text column changes outside of model
    /// detection also ask the caller for a full redraw.
    pub fn update_configuration(&mut self, autodetecting: bool, text_columns: u8, status_cells: u8) {
        let mut changed = false;

        if status_cells != self.geometry.status_cells {
            self.geometry.status_cells = status_cells;
            info!("status cell count changed to {status_cells}");
            changed = true;
        }

        if text_columns != self.geometry.text_columns {
            self.geometry.text_columns = text_columns;
            info!("text column count changed to {text_columns}");
            if !autodetecting {
                self.resize_required = true;
            }
            changed = true;
        }

        if changed {
            self.buffers.reallocate(&self.geometry);
            self.rewrite_required = true;
        }
    }

    pub fn apply_cell_configuration(&mut self, configuration: CellConfiguration, autodetecting: bool) {
        let text_columns = configuration.text_columns.unwrap_or(self.geometry.text_columns);
        let status_cells = configuration.status_cells.unwrap_or(self.geometry.status_cells);
        self.update_configuration(autodetecting, text_columns, status_cells);
    }

    /// Writes one packet.
    pub fn write(&mut self, packet: &[u8]) -> Result<(), DisplayError> {
        debug!("output packet: {}", hex(packet));
        self.transport.write_packet(packet, &mut self.write_delay)?;
        Ok(())
    }

    fn write_cells(&mut self, start: usize, cells: &[u8]) -> Result<(), DisplayError> {
        let Ok(start) = u8::try_from(start) else {
            warn!(start, count = cells.len(), "cell write beyond the addressable range dropped");
            return Ok(());
        };
        let packet = match self.variant {
            ProtocolVariant::Current | ProtocolVariant::Legacy => cells_packet(start, cells),
            ProtocolVariant::Hid => hid_cells_packet(start, cells),
        };
        self.write(&packet)
    }

    /// Sends the changed part of the text window (or all of it when a
    /// rewrite is due).  Text cells follow the status cells on the wire.
    pub fn write_window(&mut self, cells: &[u8]) -> Result<(), DisplayError> {
        if let Some(interval) = self.rewrite_interval {
            let now = Instant::now();
            if now.duration_since(self.rewrite_time) > interval {
                self.rewrite_required = true;
            }
            if self.rewrite_required {
                self.rewrite_time = now;
            }
        }

        let full = std::mem::take(&mut self.rewrite_required);
        let offset = usize::from(self.geometry.status_cells);
        let Some((from, span)) = self.buffers.update_window(cells, full) else {
            return Ok(());
        };
        let span = span.to_vec();

        let result = self.write_cells(offset + from, &span);
        if result.is_err() {
            self.rewrite_required = true;
        }
        result
    }

    /// Sends the status cells when they differ from the last ones sent.
    pub fn write_status(&mut self, cells: &[u8]) -> Result<(), DisplayError> {
        if !self.buffers.update_status(cells) {
            return Ok(());
        }
        let status = self.buffers.status().to_vec();
        self.write_cells(0, &status)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.transport.close();
    }
}

//! Waveform preamble assembly.
//!
//! The preamble is rebuilt from live readings on every request. Any failing
//! sub-read aborts the whole assembly; no partial preamble is returned.

use super::commands::marker_value;
use super::model::Capability;
use super::oscilloscope::TeledyneOscilloscope;
use super::types::{AcquisitionStatus, AcquisitionType, ChannelUnit, WaveformSource};
use crate::error::ScopeResult;
use serde::Serialize;
use tracing::debug;

/// Metadata needed to interpret a waveform transfer.
///
/// Fields a model cannot report are `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformPreamble {
    /// Interval between transferred points.
    pub sparsing: f64,
    /// Number of points requested for transfer (0 means all).
    pub requested_points: f64,
    /// Index of the first transferred point.
    pub first_point: f64,
    /// Only known after a transfer, so always `None` here.
    pub transmitted_points: Option<f64>,
    /// Memory depth in points.
    pub memory_size: f64,
    /// Points sampled for the source.
    pub sampled_points: Option<f64>,
    /// Selected source.
    pub source: WaveformSource,
    /// Acquisition mode.
    pub acquisition_type: Option<AcquisitionType>,
    /// Average count, only in `average` mode.
    pub average: Option<f64>,
    /// Sampling rate in samples/s.
    pub sampling_rate: Option<f64>,
    /// Horizontal grid divisions.
    pub grid_number: u32,
    /// Acquisition state.
    pub status: Option<AcquisitionStatus>,
    /// Horizontal scale in seconds/div.
    pub xdiv: f64,
    /// Trigger delay in seconds.
    pub xoffset: f64,
    /// Vertical scale per division.
    pub ydiv: f64,
    /// Vertical offset.
    pub yoffset: f64,
    /// Trace unit; the math trace has none.
    pub unit: Option<ChannelUnit>,
}

struct Acquisition {
    kind: AcquisitionType,
    average: Option<f64>,
    sampling_rate: f64,
    status: AcquisitionStatus,
}

struct YAxis {
    ydiv: f64,
    yoffset: f64,
    unit: Option<ChannelUnit>,
}

pub(crate) async fn assemble(
    scope: &TeledyneOscilloscope,
    source: WaveformSource,
) -> ScopeResult<WaveformPreamble> {
    let setup = scope.session().values("WFSU?").await?;
    let sparsing = marker_value(&setup, "SP")?.as_f64()?;
    let requested_points = marker_value(&setup, "NP")?.as_f64()?;
    let first_point = marker_value(&setup, "FP")?.as_f64()?;

    let has_acquisition = scope.model().supports(Capability::Acquisition);
    let sampled_points = if has_acquisition {
        Some(scope.sampled_points(source).await?)
    } else {
        None
    };
    let memory_size = scope.memory_size().await?;
    let acquisition = if has_acquisition {
        Some(read_acquisition(scope).await?)
    } else {
        None
    };
    let xdiv = scope.timebase_scale().await?;
    let xoffset = scope.timebase_offset().await?;
    let y = read_y_axis(scope, source).await?;

    debug!(%source, sampled_points, memory_size, "waveform preamble assembled");

    Ok(WaveformPreamble {
        sparsing,
        requested_points,
        first_point,
        transmitted_points: None,
        memory_size,
        sampled_points,
        source,
        acquisition_type: acquisition.as_ref().map(|a| a.kind),
        average: acquisition.as_ref().and_then(|a| a.average),
        sampling_rate: acquisition.as_ref().map(|a| a.sampling_rate),
        grid_number: scope.grid_number(),
        status: acquisition.as_ref().map(|a| a.status),
        xdiv,
        xoffset,
        ydiv: y.ydiv,
        yoffset: y.yoffset,
        unit: y.unit,
    })
}

async fn read_acquisition(scope: &TeledyneOscilloscope) -> ScopeResult<Acquisition> {
    let kind = scope.acquisition_type().await?;
    let average = if kind == AcquisitionType::Average {
        Some(scope.acquisition_average().await?)
    } else {
        None
    };
    Ok(Acquisition {
        kind,
        average,
        sampling_rate: scope.acquisition_sampling_rate().await?,
        status: scope.acquisition_status().await?,
    })
}

async fn read_y_axis(scope: &TeledyneOscilloscope, source: WaveformSource) -> ScopeResult<YAxis> {
    match source {
        WaveformSource::Math => Ok(YAxis {
            ydiv: scope.math_vdiv().await?,
            yoffset: scope.math_vpos().await?,
            unit: None,
        }),
        WaveformSource::Channel(id) => {
            let ch = scope.ch(id.index())?;
            let unit = if scope.model().supports(Capability::ChannelUnit) {
                Some(ch.unit().await?)
            } else {
                None
            };
            Ok(YAxis {
                ydiv: ch.scale().await?,
                yoffset: ch.offset().await?,
                unit,
            })
        }
    }
}

//! Instrument-level operations shared by every supported model.

use super::channel::Channel;
use super::commands;
use super::model::{Capability, ScopeModel};
use super::preamble::{self, WaveformPreamble};
use super::types::{
    AcquisitionStatus, AcquisitionType, BandwidthLimit, ChannelId, MathExpression, Timebase,
    TimebaseSetup, TriggerMode, WaveformSource,
};
use crate::adapters::{ScpiAdapter, VisaAdapter};
use crate::command::{channel_vars, no_vars, CommandDescriptor};
use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};
use crate::session::ScpiSession;
use crate::throttle::WriteThrottle;
use crate::value::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Teledyne LeCroy oscilloscope driven over one [`ScpiSession`].
///
/// ```
/// use teledyne_scope::{MockAdapter, TeledyneOscilloscope};
///
/// # async fn example() -> teledyne_scope::ScopeResult<()> {
/// let mock = MockAdapter::new().with_register("C1:VDIV", "1.00E-01V");
/// let scope = TeledyneOscilloscope::t3dso1204(mock);
/// assert_eq!(scope.ch(1)?.scale().await?, 0.1);
/// # Ok(())
/// # }
/// ```
pub struct TeledyneOscilloscope {
    session: ScpiSession,
    model: ScopeModel,
    waveform_source: WaveformSource,
}

impl TeledyneOscilloscope {
    /// Wrap an adapter for the given model with the default write interval.
    pub fn new(model: ScopeModel, adapter: impl ScpiAdapter + 'static) -> Self {
        Self::with_session(model, ScpiSession::new(adapter))
    }

    /// Use an existing session.
    pub fn with_session(model: ScopeModel, session: ScpiSession) -> Self {
        Self {
            session,
            model,
            waveform_source: WaveformSource::default(),
        }
    }

    /// LeCroy T3DSO1204.
    pub fn t3dso1204(adapter: impl ScpiAdapter + 'static) -> Self {
        Self::new(ScopeModel::T3dso1204, adapter)
    }

    /// Teledyne HDO6xxx.
    pub fn hdo6xxx(adapter: impl ScpiAdapter + 'static) -> Self {
        Self::new(ScopeModel::Hdo6xxx, adapter)
    }

    /// MAUI-family Teledyne scope.
    pub fn maui(adapter: impl ScpiAdapter + 'static) -> Self {
        Self::new(ScopeModel::Maui, adapter)
    }

    /// Open the VISA resource named in `config` and prepare the instrument.
    pub async fn from_config(config: &ScopeConfig) -> ScopeResult<Self> {
        config.validate()?;
        let mut adapter = VisaAdapter::new(config.resource.clone())
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_line_terminator(config.line_terminator.clone());
        adapter.connect().await?;

        let throttle = WriteThrottle::new(Duration::from_millis(config.write_interval_ms));
        let scope = Self::with_session(config.model, ScpiSession::with_throttle(adapter, throttle));
        scope.connect().await?;
        Ok(scope)
    }

    /// Prepare the instrument for use: replies are sent without headers.
    pub async fn connect(&self) -> ScopeResult<()> {
        info!(
            "Connecting to {} via {}",
            self.model.name(),
            self.session.description()
        );
        commands::HEADERS_OFF.execute(&self.session, &no_vars()).await
    }

    /// Selected model.
    pub fn model(&self) -> ScopeModel {
        self.model
    }

    /// Underlying command session.
    pub fn session(&self) -> &ScpiSession {
        &self.session
    }

    /// Change the minimum delay between two commands.
    pub async fn set_write_interval(&self, interval: Duration) {
        self.session.set_write_interval(interval).await;
    }

    /// Handle on channel `index` (1..4).
    pub fn ch(&self, index: u8) -> ScopeResult<Channel<'_>> {
        Ok(Channel::new(self, ChannelId::new(index)?))
    }

    /// Handles on every analog channel.
    pub fn channels(&self) -> impl Iterator<Item = Channel<'_>> {
        ChannelId::all().map(move |id| Channel::new(self, id))
    }

    async fn get(&self, desc: &CommandDescriptor) -> ScopeResult<Value> {
        desc.get(&self.session, &no_vars()).await
    }

    async fn get_f64(&self, desc: &CommandDescriptor) -> ScopeResult<f64> {
        self.get(desc).await?.as_f64()
    }

    async fn set(&self, desc: &CommandDescriptor, value: impl Into<Value>) -> ScopeResult<()> {
        desc.set(&self.session, value, &no_vars()).await
    }

    fn require(&self, capability: Capability, property: &str) -> ScopeResult<()> {
        self.model.require(capability, property)
    }

    // Control

    /// Identification string (`*IDN?`).
    pub async fn identify(&self) -> ScopeResult<String> {
        self.session.ask("*IDN?").await
    }

    /// Restore the default setup (`*RST`).
    pub async fn reset(&self) -> ScopeResult<()> {
        commands::RESET.execute(&self.session, &no_vars()).await
    }

    /// Clear the status registers (`*CLS`).
    pub async fn clear_status(&self) -> ScopeResult<()> {
        commands::CLEAR_STATUS.execute(&self.session, &no_vars()).await
    }

    /// Automatic setup of every channel and the timebase.
    pub async fn autoscale(&self) -> ScopeResult<()> {
        commands::AUTOSCALE.execute(&self.session, &no_vars()).await
    }

    /// Start continuous acquisition.
    pub async fn run(&self) -> ScopeResult<()> {
        self.set_trigger_mode(TriggerMode::Auto).await
    }

    /// Stop acquisition.
    pub async fn stop(&self) -> ScopeResult<()> {
        commands::STOP.execute(&self.session, &no_vars()).await
    }

    /// Arm a single acquisition.
    pub async fn single(&self) -> ScopeResult<()> {
        self.set_trigger_mode(TriggerMode::Single).await
    }

    /// Trigger sweep mode.
    pub async fn trigger_mode(&self) -> ScopeResult<TriggerMode> {
        TriggerMode::from_value(&self.get(&commands::TRIGGER_MODE).await?)
    }

    /// Set the trigger sweep mode.
    pub async fn set_trigger_mode(&self, mode: TriggerMode) -> ScopeResult<()> {
        self.set(&commands::TRIGGER_MODE, mode).await
    }

    // Timebase

    /// Horizontal scale in seconds/div.
    pub async fn timebase_scale(&self) -> ScopeResult<f64> {
        self.get_f64(&commands::TIMEBASE_SCALE).await
    }

    /// Set the horizontal scale in seconds/div.
    pub async fn set_timebase_scale(&self, seconds_per_div: f64) -> ScopeResult<()> {
        self.set(&commands::TIMEBASE_SCALE, seconds_per_div).await
    }

    /// Delay between the trigger and the reference position, in seconds.
    pub async fn timebase_offset(&self) -> ScopeResult<f64> {
        self.get_f64(&commands::TIMEBASE_OFFSET).await
    }

    /// Set the trigger delay in seconds.
    pub async fn set_timebase_offset(&self, seconds: f64) -> ScopeResult<()> {
        self.set(&commands::TIMEBASE_OFFSET, seconds).await
    }

    /// Zoomed window scale in seconds/div.
    pub async fn timebase_hor_magnify(&self) -> ScopeResult<f64> {
        self.require(Capability::ZoomTimebase, "timebase_hor_magnify")?;
        self.get_f64(&commands::TIMEBASE_HOR_MAGNIFY).await
    }

    /// Set the zoomed window scale (1 ns/div to 20 ms/div).
    pub async fn set_timebase_hor_magnify(&self, seconds_per_div: f64) -> ScopeResult<()> {
        self.require(Capability::ZoomTimebase, "timebase_hor_magnify")?;
        self.set(&commands::TIMEBASE_HOR_MAGNIFY, seconds_per_div).await
    }

    /// Zoomed window position in seconds.
    pub async fn timebase_hor_position(&self) -> ScopeResult<f64> {
        self.require(Capability::ZoomTimebase, "timebase_hor_position")?;
        self.get_f64(&commands::TIMEBASE_HOR_POSITION).await
    }

    /// Set the zoomed window position in seconds.
    pub async fn set_timebase_hor_position(&self, seconds: f64) -> ScopeResult<()> {
        self.require(Capability::ZoomTimebase, "timebase_hor_position")?;
        self.set(&commands::TIMEBASE_HOR_POSITION, seconds).await
    }

    /// Read the timebase. The zoom fields are only present when supported.
    pub async fn timebase(&self) -> ScopeResult<Timebase> {
        let zoom = self.model.supports(Capability::ZoomTimebase);
        Ok(Timebase {
            timebase_scale: self.timebase_scale().await?,
            timebase_offset: self.timebase_offset().await?,
            timebase_hor_magnify: if zoom {
                Some(self.timebase_hor_magnify().await?)
            } else {
                None
            },
            timebase_hor_position: if zoom {
                Some(self.timebase_hor_position().await?)
            } else {
                None
            },
        })
    }

    /// Write the given timebase fields in order; `None` fields are untouched.
    ///
    /// Changing one field can move others, so several calls may be needed.
    pub async fn timebase_setup(&self, setup: TimebaseSetup) -> ScopeResult<()> {
        if let Some(scale) = setup.scale {
            self.set_timebase_scale(scale).await?;
        }
        if let Some(offset) = setup.offset {
            self.set_timebase_offset(offset).await?;
        }
        if let Some(magnify) = setup.hor_magnify {
            self.set_timebase_hor_magnify(magnify).await?;
        }
        if let Some(position) = setup.hor_position {
            self.set_timebase_hor_position(position).await?;
        }
        Ok(())
    }

    // Acquisition

    /// Acquisition mode.
    pub async fn acquisition_type(&self) -> ScopeResult<AcquisitionType> {
        self.require(Capability::Acquisition, "acquisition_type")?;
        AcquisitionType::from_value(&self.get(&commands::ACQUISITION_TYPE).await?)
    }

    /// Set the acquisition mode.
    pub async fn set_acquisition_type(&self, kind: AcquisitionType) -> ScopeResult<()> {
        self.require(Capability::Acquisition, "acquisition_type")?;
        self.set(&commands::ACQUISITION_TYPE, kind).await
    }

    /// Number of averaged acquisitions.
    pub async fn acquisition_average(&self) -> ScopeResult<f64> {
        self.require(Capability::Acquisition, "acquisition_average")?;
        self.get_f64(&commands::ACQUISITION_AVERAGE).await
    }

    /// Set the number of averaged acquisitions (4, 16, 32 ... 1024).
    pub async fn set_acquisition_average(&self, count: u32) -> ScopeResult<()> {
        self.require(Capability::Acquisition, "acquisition_average")?;
        self.set(&commands::ACQUISITION_AVERAGE, count).await
    }

    /// Acquisition state.
    pub async fn acquisition_status(&self) -> ScopeResult<AcquisitionStatus> {
        self.require(Capability::Acquisition, "acquisition_status")?;
        AcquisitionStatus::from_value(&self.get(&commands::ACQUISITION_STATUS).await?)
    }

    /// Sampling rate in samples/s.
    pub async fn acquisition_sampling_rate(&self) -> ScopeResult<f64> {
        self.require(Capability::Acquisition, "acquisition_sampling_rate")?;
        self.get_f64(&commands::ACQUISITION_SAMPLING_RATE).await
    }

    /// Number of points sampled on `channel`.
    ///
    /// Channels 1/2 and 3/4 share an ADC, so the even channel is read through
    /// its partner and both always report the same size.
    pub async fn acquisition_sample_size(&self, channel: ChannelId) -> ScopeResult<f64> {
        self.require(Capability::Acquisition, "acquisition_sample_size")?;
        let leader = channel.adc_leader();
        commands::SAMPLE_SIZE
            .get(&self.session, &channel_vars(leader.index()))
            .await?
            .as_f64()
    }

    /// Points sampled for `source`. For the math trace this is the smaller of
    /// the two operand channels.
    pub async fn sampled_points(&self, source: WaveformSource) -> ScopeResult<f64> {
        match source {
            WaveformSource::Channel(ch) => self.acquisition_sample_size(ch).await,
            WaveformSource::Math => {
                let expr = self.math_define().await?;
                let left = self.acquisition_sample_size(expr.left).await?;
                let right = self.acquisition_sample_size(expr.right).await?;
                Ok(left.min(right))
            }
        }
    }

    fn memory_size_descriptor(&self) -> &'static CommandDescriptor {
        if self.model.supports(Capability::DiscreteMemorySize) {
            &*commands::MEMORY_SIZE
        } else {
            &*commands::MAUI_MEMORY_SIZE
        }
    }

    /// Maximum memory depth in points.
    pub async fn memory_size(&self) -> ScopeResult<f64> {
        self.get_f64(self.memory_size_descriptor()).await
    }

    /// Select the memory depth.
    ///
    /// T3DSO1204 and HDO6xxx accept 7K, 14K, 70K ... 14M given as numbers
    /// (`14e6`). MAUI scopes accept any number or a token such as `"25MA"`.
    pub async fn set_memory_size(&self, depth: impl Into<Value>) -> ScopeResult<()> {
        self.set(self.memory_size_descriptor(), depth).await
    }

    // Waveform

    /// Source used for waveform transfers and the preamble.
    pub fn waveform_source(&self) -> WaveformSource {
        self.waveform_source
    }

    /// Select the waveform source from a token (`1`..`4`, `C1`..`C4`, `MATH`).
    pub fn set_waveform_source(&mut self, source: &str) -> ScopeResult<()> {
        self.select_waveform_source(source.parse()?);
        Ok(())
    }

    /// Select the waveform source.
    pub fn select_waveform_source(&mut self, source: WaveformSource) {
        debug!(%source, "waveform source selected");
        self.waveform_source = source;
    }

    /// Number of points to transfer (0 means all).
    pub async fn waveform_points(&self) -> ScopeResult<f64> {
        self.get_f64(&commands::WAVEFORM_POINTS).await
    }

    /// Set the number of points to transfer.
    pub async fn set_waveform_points(&self, points: u32) -> ScopeResult<()> {
        self.set(&commands::WAVEFORM_POINTS, points).await
    }

    /// Interval between transferred points.
    pub async fn waveform_sparsing(&self) -> ScopeResult<f64> {
        self.get_f64(&commands::WAVEFORM_SPARSING).await
    }

    /// Set the interval between transferred points.
    pub async fn set_waveform_sparsing(&self, interval: u32) -> ScopeResult<()> {
        self.set(&commands::WAVEFORM_SPARSING, interval).await
    }

    /// Index of the first transferred point.
    pub async fn waveform_first_point(&self) -> ScopeResult<f64> {
        self.get_f64(&commands::WAVEFORM_FIRST_POINT).await
    }

    /// Set the index of the first transferred point.
    pub async fn set_waveform_first_point(&self, point: u32) -> ScopeResult<()> {
        self.set(&commands::WAVEFORM_FIRST_POINT, point).await
    }

    /// Horizontal grid divisions.
    pub fn grid_number(&self) -> u32 {
        self.model.grid_number()
    }

    /// Snapshot describing the selected waveform source.
    pub async fn waveform_preamble(&self) -> ScopeResult<WaveformPreamble> {
        preamble::assemble(self, self.waveform_source).await
    }

    // Math

    /// Current math trace definition.
    pub async fn math_define(&self) -> ScopeResult<MathExpression> {
        let value = self.get(&commands::MATH_DEFINE).await?;
        value.as_text()?.parse()
    }

    /// Define the math trace, e.g. `C1+C2`.
    pub async fn set_math_define(&self, expr: MathExpression) -> ScopeResult<()> {
        self.set(&commands::MATH_DEFINE, expr.to_string()).await
    }

    /// Math trace vertical scale in volts/div.
    pub async fn math_vdiv(&self) -> ScopeResult<f64> {
        self.get_f64(&commands::MATH_VDIV).await
    }

    /// Set the math trace vertical scale.
    pub async fn set_math_vdiv(&self, volts_per_div: f64) -> ScopeResult<()> {
        self.set(&commands::MATH_VDIV, volts_per_div).await
    }

    /// Math trace vertical position in display units.
    pub async fn math_vpos(&self) -> ScopeResult<f64> {
        self.get_f64(&commands::MATH_VPOS).await
    }

    /// Set the math trace vertical position (-255..255).
    pub async fn set_math_vpos(&self, position: i32) -> ScopeResult<()> {
        self.set(&commands::MATH_VPOS, position).await
    }

    // Bandwidth

    /// Bandwidth limit of every channel.
    pub async fn bwlimits(&self) -> ScopeResult<BTreeMap<ChannelId, BandwidthLimit>> {
        if self.model.supports(Capability::CombinedBandwidthReadback) {
            return self.combined_bwlimits().await;
        }
        let mut limits = BTreeMap::new();
        for id in ChannelId::all() {
            let reply = commands::BWLIMIT
                .get(&self.session, &channel_vars(id.index()))
                .await?;
            limits.insert(id, BandwidthLimit::from_value(&reply)?);
        }
        Ok(limits)
    }

    /// Parse the all-channel `BWL?` reply (`C1,OFF,C2,ON,...`).
    pub(crate) async fn combined_bwlimits(
        &self,
    ) -> ScopeResult<BTreeMap<ChannelId, BandwidthLimit>> {
        let items = self.get(&commands::ALL_BWLIMIT).await?.into_list();
        if items.len() % 2 != 0 {
            return Err(ScopeError::parse(format!(
                "bandwidth limit reply has {} fields, expected channel/limit pairs",
                items.len()
            )));
        }
        items
            .chunks(2)
            .map(|pair| -> ScopeResult<(ChannelId, BandwidthLimit)> {
                let channel = pair[0]
                    .to_string()
                    .parse::<ChannelId>()
                    .map_err(|e| ScopeError::parse(e.to_string()))?;
                Ok((channel, BandwidthLimit::from_value(&pair[1])?))
            })
            .collect()
    }

    /// Apply one bandwidth limit to every channel.
    pub async fn set_bwlimit_all(&self, limit: BandwidthLimit) -> ScopeResult<()> {
        if self.model.supports(Capability::CombinedBandwidthReadback) {
            return self.set(&commands::ALL_BWLIMIT, limit).await;
        }
        for channel in self.channels() {
            channel.set_bwlimit(limit).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;

    #[tokio::test(start_paused = true)]
    async fn test_connect_disables_headers() {
        let mock = MockAdapter::new();
        let scope = TeledyneOscilloscope::t3dso1204(mock.clone());
        scope.connect().await.unwrap();
        assert_eq!(mock.commands(), vec!["CHDR OFF"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_index_is_validated() {
        let scope = TeledyneOscilloscope::t3dso1204(MockAdapter::new());
        assert!(scope.ch(0).is_err());
        assert!(scope.ch(5).unwrap_err().is_invalid_argument());
        assert_eq!(scope.channels().count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stop_single() {
        let mock = MockAdapter::new();
        let scope = TeledyneOscilloscope::t3dso1204(mock.clone());
        scope.run().await.unwrap();
        scope.stop().await.unwrap();
        scope.single().await.unwrap();
        assert_eq!(mock.commands(), vec!["TRMD AUTO", "STOP", "TRMD SINGLE"]);
        assert_eq!(scope.trigger_mode().await.unwrap(), TriggerMode::Single);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timebase_setup_only_writes_given_fields() {
        let mock = MockAdapter::new();
        let scope = TeledyneOscilloscope::t3dso1204(mock.clone());
        scope
            .timebase_setup(TimebaseSetup {
                scale: Some(1e-3),
                hor_position: Some(2e-4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mock.commands(), vec!["TDIV 1.00E-03S", "HPOS 2.00E-04S"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_size_shares_adc() {
        let mock = MockAdapter::new()
            .with_register("SANU C1", "1.40E+07pts")
            .with_register("SANU C3", "7000pts");
        let scope = TeledyneOscilloscope::t3dso1204(mock);
        let mut sizes = Vec::new();
        for id in ChannelId::all() {
            sizes.push(scope.acquisition_sample_size(id).await.unwrap());
        }
        assert_eq!(sizes, vec![14e6, 14e6, 7000.0, 7000.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_math_definition() {
        let mock = MockAdapter::new().with_register("DEF", "EQN,'FFT(C1)'");
        let scope = TeledyneOscilloscope::t3dso1204(mock);
        let err = scope.sampled_points(WaveformSource::Math).await.unwrap_err();
        assert!(matches!(err, ScopeError::Parse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waveform_source_selection() {
        let mut scope = TeledyneOscilloscope::t3dso1204(MockAdapter::new());
        assert_eq!(scope.waveform_source().to_string(), "C1");
        scope.set_waveform_source("MATH").unwrap();
        assert_eq!(scope.waveform_source(), WaveformSource::Math);
        assert!(scope.set_waveform_source("C5").unwrap_err().is_invalid_argument());
        assert_eq!(scope.waveform_source(), WaveformSource::Math);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_channel_bwlimits_without_combined_readback() {
        let mock = MockAdapter::new();
        let scope = TeledyneOscilloscope::hdo6xxx(mock.clone());
        scope.set_bwlimit_all(BandwidthLimit::On).await.unwrap();
        let limits = scope.bwlimits().await.unwrap();
        assert_eq!(limits.len(), 4);
        assert!(limits.values().all(|l| *l == BandwidthLimit::On));
    }

    #[tokio::test(start_paused = true)]
    async fn test_combined_bwlimits_reply_must_pair_up() {
        let mock = MockAdapter::new().with_register("BWL", "C1,OFF,C2");
        let scope = TeledyneOscilloscope::maui(mock);
        let err = scope.bwlimits().await.unwrap_err();
        assert!(matches!(err, ScopeError::Parse(_)));
        let err = scope.ch(1).unwrap().bwlimit().await.unwrap_err();
        assert!(matches!(err, ScopeError::Parse(_)));
    }
}

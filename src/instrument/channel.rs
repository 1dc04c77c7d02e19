//! Per-channel view of an oscilloscope.
//!
//! A [`Channel`] borrows its oscilloscope and holds nothing but the channel
//! index; every getter re-queries the instrument.

use super::commands;
use super::model::Capability;
use super::oscilloscope::TeledyneOscilloscope;
use super::types::{
    BandwidthLimit, ChannelConfiguration, ChannelId, ChannelUnit, Coupling, TriggerCoupling,
    TriggerSlope,
};
use crate::command::{channel_vars, CommandDescriptor, CommandVars};
use crate::error::{ScopeError, ScopeResult};
use crate::value::Value;
use std::fmt;
use tracing::debug;

/// Analog input `C1`..`C4` of a [`TeledyneOscilloscope`].
#[derive(Clone, Copy)]
pub struct Channel<'a> {
    scope: &'a TeledyneOscilloscope,
    id: ChannelId,
}

impl fmt::Debug for Channel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("model", &self.scope.model())
            .finish()
    }
}

impl<'a> Channel<'a> {
    pub(crate) fn new(scope: &'a TeledyneOscilloscope, id: ChannelId) -> Self {
        Self { scope, id }
    }

    /// Channel index.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    fn vars(&self) -> CommandVars {
        channel_vars(self.id.index())
    }

    async fn get(&self, desc: &CommandDescriptor) -> ScopeResult<Value> {
        desc.get(self.scope.session(), &self.vars()).await
    }

    async fn set(&self, desc: &CommandDescriptor, value: impl Into<Value>) -> ScopeResult<()> {
        desc.set(self.scope.session(), value, &self.vars()).await
    }

    fn require(&self, capability: Capability, property: &str) -> ScopeResult<()> {
        self.scope.model().require(capability, property)
    }

    /// Probe attenuation factor.
    pub async fn probe_attenuation(&self) -> ScopeResult<f64> {
        self.get(&commands::ATTENUATION).await?.as_f64()
    }

    /// Set the probe attenuation factor (0.1 to 10000 in 1-2-5 steps).
    pub async fn set_probe_attenuation(&self, factor: f64) -> ScopeResult<()> {
        self.set(&commands::ATTENUATION, factor).await
    }

    /// Bandwidth limit of this channel.
    ///
    /// MAUI scopes only report limits for all channels at once; the entry for
    /// this channel is picked out of that reply.
    pub async fn bwlimit(&self) -> ScopeResult<BandwidthLimit> {
        if self.scope.model().supports(Capability::CombinedBandwidthReadback) {
            let limits = self.scope.combined_bwlimits().await?;
            return limits.get(&self.id).copied().ok_or_else(|| {
                ScopeError::parse(format!("bandwidth limit reply has no entry for {}", self.id))
            });
        }
        BandwidthLimit::from_value(&self.get(&commands::BWLIMIT).await?)
    }

    /// Set the bandwidth limit of this channel.
    pub async fn set_bwlimit(&self, limit: BandwidthLimit) -> ScopeResult<()> {
        let desc = if self.scope.model().supports(Capability::Bandwidth200Mhz) {
            &commands::MAUI_BWLIMIT
        } else {
            &commands::BWLIMIT
        };
        self.set(desc, limit).await
    }

    /// Input coupling.
    pub async fn coupling(&self) -> ScopeResult<Coupling> {
        Coupling::from_value(&self.get(&commands::COUPLING).await?)
    }

    /// Set the input coupling.
    pub async fn set_coupling(&self, coupling: Coupling) -> ScopeResult<()> {
        self.set(&commands::COUPLING, coupling).await
    }

    /// Whether the trace is displayed.
    pub async fn display(&self) -> ScopeResult<bool> {
        self.get(&commands::DISPLAY).await?.as_bool()
    }

    /// Show or hide the trace.
    pub async fn set_display(&self, on: bool) -> ScopeResult<()> {
        self.set(&commands::DISPLAY, on).await
    }

    /// Vertical offset in volts.
    pub async fn offset(&self) -> ScopeResult<f64> {
        self.get(&commands::OFFSET).await?.as_f64()
    }

    /// Set the vertical offset in volts.
    pub async fn set_offset(&self, volts: f64) -> ScopeResult<()> {
        self.set(&commands::OFFSET, volts).await
    }

    /// Vertical scale in volts/div.
    pub async fn scale(&self) -> ScopeResult<f64> {
        self.get(&commands::SCALE).await?.as_f64()
    }

    /// Set the vertical scale in volts/div.
    pub async fn set_scale(&self, volts_per_div: f64) -> ScopeResult<()> {
        self.set(&commands::SCALE, volts_per_div).await
    }

    /// Trigger coupling.
    pub async fn trigger_coupling(&self) -> ScopeResult<TriggerCoupling> {
        TriggerCoupling::from_value(&self.get(&commands::TRIGGER_COUPLING).await?)
    }

    /// Set the trigger coupling.
    pub async fn set_trigger_coupling(&self, coupling: TriggerCoupling) -> ScopeResult<()> {
        self.set(&commands::TRIGGER_COUPLING, coupling).await
    }

    /// Trigger level in volts.
    pub async fn trigger_level(&self) -> ScopeResult<f64> {
        self.get(&commands::TRIGGER_LEVEL).await?.as_f64()
    }

    /// Set the trigger level in volts.
    ///
    /// The firmware expects the level divided by the probe attenuation, and
    /// silently clamps out-of-range values.
    pub async fn set_trigger_level(&self, volts: f64) -> ScopeResult<()> {
        self.set(&commands::TRIGGER_LEVEL, volts).await
    }

    fn trigger_slope_descriptor(&self) -> &'static CommandDescriptor {
        if self.scope.model().supports(Capability::WindowTriggerSlope) {
            &*commands::TRIGGER_SLOPE
        } else {
            &*commands::MAUI_TRIGGER_SLOPE
        }
    }

    /// Trigger slope.
    pub async fn trigger_slope(&self) -> ScopeResult<TriggerSlope> {
        TriggerSlope::from_value(&self.get(self.trigger_slope_descriptor()).await?)
    }

    /// Set the trigger slope.
    pub async fn set_trigger_slope(&self, slope: TriggerSlope) -> ScopeResult<()> {
        self.set(self.trigger_slope_descriptor(), slope).await
    }

    /// Whether the input signal is inverted.
    pub async fn invert(&self) -> ScopeResult<bool> {
        self.require(Capability::ChannelInvert, "invert")?;
        self.get(&commands::INVERT).await?.as_bool()
    }

    /// Invert the input signal.
    pub async fn set_invert(&self, on: bool) -> ScopeResult<()> {
        self.require(Capability::ChannelInvert, "invert")?;
        self.set(&commands::INVERT, on).await
    }

    /// Channel-to-channel skew in seconds.
    pub async fn skew_factor(&self) -> ScopeResult<f64> {
        self.require(Capability::ChannelSkew, "skew_factor")?;
        self.get(&commands::SKEW_FACTOR).await?.as_f64()
    }

    /// Set the skew in seconds, within ±100 ns.
    pub async fn set_skew_factor(&self, seconds: f64) -> ScopeResult<()> {
        self.require(Capability::ChannelSkew, "skew_factor")?;
        self.set(&commands::SKEW_FACTOR, seconds).await
    }

    /// Lower trigger level used by runt/slope triggers, in volts.
    pub async fn trigger_level2(&self) -> ScopeResult<f64> {
        self.require(Capability::SecondaryTriggerLevel, "trigger_level2")?;
        self.get(&commands::TRIGGER_LEVEL2).await?.as_f64()
    }

    /// Set the lower trigger level in volts.
    pub async fn set_trigger_level2(&self, volts: f64) -> ScopeResult<()> {
        self.require(Capability::SecondaryTriggerLevel, "trigger_level2")?;
        self.set(&commands::TRIGGER_LEVEL2, volts).await
    }

    /// Unit of the trace.
    pub async fn unit(&self) -> ScopeResult<ChannelUnit> {
        self.require(Capability::ChannelUnit, "unit")?;
        ChannelUnit::from_value(&self.get(&commands::UNIT).await?)
    }

    /// Set the unit of the trace.
    pub async fn set_unit(&self, unit: ChannelUnit) -> ScopeResult<()> {
        self.require(Capability::ChannelUnit, "unit")?;
        self.set(&commands::UNIT, unit).await
    }

    /// Run the auto-setup for this channel only.
    pub async fn autoscale(&self) -> ScopeResult<()> {
        self.require(Capability::ChannelAutoSetup, "autoscale")?;
        debug!(channel = %self.id, "channel auto-setup");
        commands::CHANNEL_AUTOSCALE
            .execute(self.scope.session(), &self.vars())
            .await
    }

    /// Read a measurement parameter such as `RMS`, `PKPK` or `FREQ`.
    ///
    /// The reply is numeric when the instrument could measure the parameter.
    pub async fn measure_parameter(&self, parameter: &str) -> ScopeResult<Value> {
        let parameter = parameter.trim();
        if parameter.is_empty() || !parameter.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ScopeError::invalid(format!(
                "'{parameter}' is not a measurement parameter name"
            )));
        }
        let mut vars = self.vars();
        vars.insert("param".to_string(), parameter.to_ascii_uppercase());
        commands::MEASURE_PARAMETER
            .get(self.scope.session(), &vars)
            .await
    }

    /// Snapshot of this channel's vertical and trigger settings.
    pub async fn current_configuration(&self) -> ScopeResult<ChannelConfiguration> {
        Ok(ChannelConfiguration {
            channel: self.id.index(),
            attenuation: self.probe_attenuation().await?,
            bandwidth_limit: self.bwlimit().await?,
            coupling: self.coupling().await?,
            offset: self.offset().await?,
            display: self.display().await?,
            volts_div: self.scale().await?,
            trigger_coupling: self.trigger_coupling().await?,
            trigger_level: self.trigger_level().await?,
            trigger_slope: self.trigger_slope().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::instrument::ScopeModel;

    fn scope(model: ScopeModel) -> (TeledyneOscilloscope, MockAdapter) {
        let mock = MockAdapter::new();
        (TeledyneOscilloscope::new(model, mock.clone()), mock)
    }

    #[test]
    fn test_debug_names_channel_and_model() {
        let (scope, _) = scope(ScopeModel::Maui);
        let ch = scope.ch(2).unwrap();
        assert_eq!(format!("{ch:?}"), "Channel { id: ChannelId(2), model: Maui }");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scale_command_format() {
        let (scope, mock) = scope(ScopeModel::T3dso1204);
        scope.ch(2).unwrap().set_scale(0.05).await.unwrap();
        assert_eq!(mock.commands(), vec!["C2:VDIV 5.00E-02V"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coupling_round_trip() {
        let (scope, mock) = scope(ScopeModel::T3dso1204);
        let ch = scope.ch(3).unwrap();
        ch.set_coupling(Coupling::Ground).await.unwrap();
        assert_eq!(mock.register("C3:CPL").unwrap(), "GND");
        assert_eq!(ch.coupling().await.unwrap(), Coupling::Ground);
    }

    #[tokio::test(start_paused = true)]
    async fn test_t3dso_rejects_200mhz_limit() {
        let (scope, mock) = scope(ScopeModel::T3dso1204);
        let err = scope
            .ch(1)
            .unwrap()
            .set_bwlimit(BandwidthLimit::Mhz200)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(mock.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoscale_needs_capability() {
        let (t3, mock) = scope(ScopeModel::T3dso1204);
        let err = t3.ch(1).unwrap().autoscale().await.unwrap_err();
        assert!(matches!(err, ScopeError::NotSupported(_)));
        assert!(mock.commands().is_empty());

        let (hdo, mock) = scope(ScopeModel::Hdo6xxx);
        hdo.ch(4).unwrap().autoscale().await.unwrap();
        assert_eq!(mock.commands(), vec!["C4:AUTO_SETUP FIND"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_parameter() {
        let (scope, mock) = scope(ScopeModel::Hdo6xxx);
        mock.set_register("C1:PAVA RMS", "RMS,1.25E-01V");
        let ch = scope.ch(1).unwrap();
        assert_eq!(ch.measure_parameter("rms").await.unwrap(), Value::Number(0.125));
        assert!(ch.measure_parameter("RMS; *RST").await.unwrap_err().is_invalid_argument());
    }
}

//! Typed instrument tokens and snapshot structs.
//!
//! Every enum carries its semantic label (`"ac 1M"`, `"average"`, ...).
//! The device-side tokens live in the descriptor tables in
//! [`super::commands`], so the same label can map to different wire tokens
//! on different models.

use crate::error::{ScopeError, ScopeResult};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[allow(missing_docs)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $label)] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Semantic label.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Convert a decoded reply; an unknown label is a parse failure.
            pub fn from_value(value: &Value) -> ScopeResult<Self> {
                let label = value.primary().to_string();
                label.parse().map_err(|_| {
                    ScopeError::parse(format!(
                        "'{}' is not a known {}",
                        label,
                        stringify!($name)
                    ))
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ScopeError;

            fn from_str(s: &str) -> ScopeResult<Self> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        let labels: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        ScopeError::invalid(format!(
                            "'{}' is not a valid {} (expected one of: {})",
                            s,
                            stringify!($name),
                            labels.join(", ")
                        ))
                    })
            }
        }

        impl From<$name> for Value {
            fn from(v: $name) -> Value {
                Value::Text(v.as_str().to_string())
            }
        }
    };
}

token_enum! {
    /// Channel input coupling.
    Coupling {
        Ac1M => "ac 1M",
        Dc1M => "dc 1M",
        Ground => "ground",
    }
}

token_enum! {
    /// Trigger coupling of a channel used as trigger source.
    TriggerCoupling {
        Ac => "ac",
        Dc => "dc",
        HighPass => "highpass",
        LowPass => "lowpass",
    }
}

token_enum! {
    /// Trigger slope. `window` is not available on MAUI scopes.
    TriggerSlope {
        Negative => "negative",
        Positive => "positive",
        Window => "window",
    }
}

token_enum! {
    /// Channel bandwidth limit. `200MHZ` only exists on MAUI scopes.
    BandwidthLimit {
        Off => "OFF",
        On => "ON",
        Mhz200 => "200MHZ",
    }
}

token_enum! {
    /// Acquisition mode.
    AcquisitionType {
        Normal => "normal",
        Peak => "peak",
        Average => "average",
        HighRes => "highres",
    }
}

token_enum! {
    /// Acquisition state machine as reported by `SAST?`.
    AcquisitionStatus {
        Stopped => "stopped",
        Triggered => "triggered",
        Ready => "ready",
        Auto => "auto",
        Armed => "armed",
    }
}

token_enum! {
    /// Trigger sweep mode.
    TriggerMode {
        Auto => "auto",
        Normal => "normal",
        Single => "single",
        Stop => "stop",
    }
}

token_enum! {
    /// Unit of a channel trace.
    ChannelUnit {
        Ampere => "A",
        Volt => "V",
    }
}

token_enum! {
    /// Operator of a two-operand math definition.
    MathOperator {
        Add => "+",
        Subtract => "-",
        Multiply => "*",
        Divide => "/",
    }
}

/// Index of an analog input, always in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Number of analog inputs.
    pub const COUNT: u8 = 4;

    /// Validate a channel index.
    pub fn new(index: u8) -> ScopeResult<Self> {
        if (1..=Self::COUNT).contains(&index) {
            Ok(Self(index))
        } else {
            Err(ScopeError::invalid(format!(
                "channel {index} does not exist (valid channels are 1..{})",
                Self::COUNT
            )))
        }
    }

    /// All analog inputs.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (1..=Self::COUNT).map(ChannelId)
    }

    /// Channel index.
    pub fn index(self) -> u8 {
        self.0
    }

    /// Channel that owns the ADC this channel shares (1 for 1/2, 3 for 3/4).
    pub fn adc_leader(self) -> Self {
        if self.0 % 2 == 0 {
            Self(self.0 - 1)
        } else {
            self
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ScopeError;

    /// Accepts `1`..`4` and `C1`..`C4` (case-insensitive).
    fn from_str(s: &str) -> ScopeResult<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix('C')
            .or_else(|| s.strip_prefix('c'))
            .unwrap_or(s);
        match digits.as_bytes() {
            [d @ b'1'..=b'4'] => Ok(Self(d - b'0')),
            _ => Err(ScopeError::invalid(format!("'{s}' is not a channel (C1..C4)"))),
        }
    }
}

impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Selected waveform source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveformSource {
    /// A physical analog input.
    Channel(ChannelId),
    /// The math trace, defined from two physical channels.
    Math,
}

impl Default for WaveformSource {
    fn default() -> Self {
        WaveformSource::Channel(ChannelId(1))
    }
}

impl fmt::Display for WaveformSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveformSource::Channel(ch) => ch.fmt(f),
            WaveformSource::Math => f.write_str("MATH"),
        }
    }
}

impl FromStr for WaveformSource {
    type Err = ScopeError;

    fn from_str(s: &str) -> ScopeResult<Self> {
        if s.trim().eq_ignore_ascii_case("MATH") {
            return Ok(WaveformSource::Math);
        }
        s.parse::<ChannelId>()
            .map(WaveformSource::Channel)
            .map_err(|_| {
                ScopeError::invalid(format!(
                    "waveform source '{}' must be 1,2,3,4 or C1..C4,MATH",
                    s.trim()
                ))
            })
    }
}

impl From<ChannelId> for WaveformSource {
    fn from(ch: ChannelId) -> Self {
        WaveformSource::Channel(ch)
    }
}

impl Serialize for WaveformSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

static MATH_DEFINITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^'?(\w+)([+\-*/])(\w+)'?$")
        .unwrap_or_else(|e| unreachable!("invalid math definition pattern: {e}"))
});

/// Two-operand math trace definition, e.g. `C1+C2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathExpression {
    /// First operand.
    pub left: ChannelId,
    /// Arithmetic operator.
    pub operator: MathOperator,
    /// Second operand.
    pub right: ChannelId,
}

impl MathExpression {
    /// Build an expression from its parts.
    pub fn new(left: ChannelId, operator: MathOperator, right: ChannelId) -> Self {
        Self {
            left,
            operator,
            right,
        }
    }
}

impl fmt::Display for MathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, self.operator, self.right)
    }
}

impl FromStr for MathExpression {
    type Err = ScopeError;

    /// Parse `'C1+C2'` (quotes optional). Malformed text is a parse error.
    fn from_str(s: &str) -> ScopeResult<Self> {
        let s = s.trim();
        let caps = MATH_DEFINITION_RE
            .captures(s)
            .ok_or_else(|| ScopeError::parse(format!("math definition '{s}' is not 'Cx<op>Cy'")))?;
        let operand = |token: &str| {
            token.parse::<ChannelId>().map_err(|_| {
                ScopeError::parse(format!(
                    "math operand '{token}' in '{s}' is not a physical channel"
                ))
            })
        };
        Ok(Self {
            left: operand(&caps[1])?,
            operator: caps[2].parse().map_err(|_| {
                ScopeError::parse(format!("unknown math operator in '{s}'"))
            })?,
            right: operand(&caps[3])?,
        })
    }
}

/// Main and zoom timebase readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timebase {
    /// Horizontal scale in seconds/div.
    pub timebase_scale: f64,
    /// Delay between trigger and reference position, in seconds.
    pub timebase_offset: f64,
    /// Zoomed window scale in seconds/div.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timebase_hor_magnify: Option<f64>,
    /// Zoomed window position in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timebase_hor_position: Option<f64>,
}

/// Partial timebase update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimebaseSetup {
    /// Horizontal scale in seconds/div.
    pub scale: Option<f64>,
    /// Trigger delay in seconds.
    pub offset: Option<f64>,
    /// Zoomed window scale in seconds/div.
    pub hor_magnify: Option<f64>,
    /// Zoomed window position in seconds.
    pub hor_position: Option<f64>,
}

/// Snapshot of one channel's vertical and trigger settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct ChannelConfiguration {
    pub channel: u8,
    pub attenuation: f64,
    pub bandwidth_limit: BandwidthLimit,
    pub coupling: Coupling,
    pub offset: f64,
    pub display: bool,
    pub volts_div: f64,
    pub trigger_coupling: TriggerCoupling,
    pub trigger_level: f64,
    pub trigger_slope: TriggerSlope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_labels_round_trip() {
        for coupling in Coupling::ALL {
            assert_eq!(coupling.as_str().parse::<Coupling>().unwrap(), *coupling);
        }
        assert_eq!("200mhz".parse::<BandwidthLimit>().unwrap(), BandwidthLimit::Mhz200);
        assert!("ac 50".parse::<Coupling>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_from_value_is_a_parse_error() {
        let err = TriggerSlope::from_value(&Value::Text("SIDEWAYS".into())).unwrap_err();
        assert!(matches!(err, ScopeError::Parse(_)));
        let avg = AcquisitionType::from_value(&Value::List(vec!["average".into(), 16.0.into()]));
        assert_eq!(avg.unwrap(), AcquisitionType::Average);
    }

    #[test]
    fn test_channel_id_bounds() {
        assert!(ChannelId::new(0).is_err());
        assert!(ChannelId::new(5).is_err());
        assert_eq!(ChannelId::new(4).unwrap().index(), 4);
        assert_eq!(ChannelId::all().count(), 4);
    }

    #[test]
    fn test_adc_leader() {
        let leaders: Vec<u8> = ChannelId::all().map(|c| c.adc_leader().index()).collect();
        assert_eq!(leaders, vec![1, 1, 3, 3]);
    }

    #[test]
    fn test_waveform_source_tokens() {
        assert_eq!("C3".parse::<WaveformSource>().unwrap().to_string(), "C3");
        assert_eq!("2".parse::<WaveformSource>().unwrap().to_string(), "C2");
        assert_eq!("math".parse::<WaveformSource>().unwrap(), WaveformSource::Math);
        assert_eq!(WaveformSource::default().to_string(), "C1");

        let err = "C5".parse::<WaveformSource>().unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("must be 1,2,3,4 or C1..C4,MATH"));

        for token in ["C+1", "+2", "C03", "01", "C", "CC1", "0", "C1.0"] {
            let err = token.parse::<WaveformSource>().unwrap_err();
            assert!(err.is_invalid_argument(), "{token}");
        }
    }

    #[test]
    fn test_math_expression_parse() {
        let expr: MathExpression = "'C1+C2'".parse().unwrap();
        assert_eq!(expr.left.index(), 1);
        assert_eq!(expr.operator, MathOperator::Add);
        assert_eq!(expr.right.index(), 2);
        assert_eq!(expr.to_string(), "C1+C2");

        let expr: MathExpression = "C3/C4".parse().unwrap();
        assert_eq!(expr.operator, MathOperator::Divide);
    }

    #[test]
    fn test_malformed_math_expression() {
        for text in ["'C1'", "'C1+C2+C3'", "'F1*C2'", "", "'C1%C2'"] {
            let err = text.parse::<MathExpression>().unwrap_err();
            assert!(matches!(err, ScopeError::Parse(_)), "{text}");
        }
    }

    #[test]
    fn test_serialize_labels() {
        assert_eq!(serde_json::to_string(&Coupling::Dc1M).unwrap(), "\"dc 1M\"");
        assert_eq!(serde_json::to_string(&WaveformSource::Math).unwrap(), "\"MATH\"");
    }
}

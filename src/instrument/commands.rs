//! Descriptor tables for the Teledyne LeCroy command set.
//!
//! Channel-scoped templates use `{ch}`; everything else is instrument-wide.
//! Model-specific variants carry a `MAUI_` prefix.

use crate::command::CommandDescriptor;
use crate::error::{ScopeError, ScopeResult};
use crate::validators::Validator;
use crate::value::{strip_unit, Value, ValueFormat};
use once_cell::sync::Lazy;

type Descriptor = Lazy<CommandDescriptor>;

const SCI2: ValueFormat = ValueFormat::Scientific(2);

/// Probe attenuation factors accepted by `ATTN`.
pub const PROBE_ATTENUATIONS: [f64; 16] = [
    0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0,
    10000.0,
];

/// Average counts accepted by `AVGA`.
pub const AVERAGE_COUNTS: [f64; 8] = [4.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0];

/// Memory depths accepted by `MSIZ` on T3DSO1204 and HDO6xxx.
pub const MEMORY_SIZES: [(f64, &str); 8] = [
    (7e3, "7K"),
    (7e4, "70K"),
    (7e5, "700K"),
    (7e6, "7M"),
    (14e3, "14K"),
    (14e4, "140K"),
    (14e5, "1.4M"),
    (14e6, "14M"),
];

/// Value following `marker` in a `WFSU?` reply (`SP,1,NP,0,FP,0`).
pub fn marker_value(values: &[Value], marker: &str) -> ScopeResult<Value> {
    values
        .iter()
        .position(|v| v.matches_token(marker))
        .and_then(|i| values.get(i + 1))
        .cloned()
        .ok_or_else(|| ScopeError::parse(format!("marker '{marker}' missing from WFSU reply")))
}

fn marker(value: Value, name: &str) -> ScopeResult<Value> {
    marker_value(&value.into_list(), name)
}

/// Quoted expression out of a `DEF? EQN` reply (`EQN,'C1+C2'`).
fn math_equation(value: Value) -> ScopeResult<Value> {
    match value.into_list().as_slice() {
        [_, equation, ..] => Ok(equation.clone()),
        other => Err(ScopeError::parse(format!(
            "math definition reply {:?} has no equation field",
            other
        ))),
    }
}

/// Last field of a `PAVA?` reply with its unit removed.
fn parameter_reading(reply: &str) -> String {
    strip_unit(reply.rsplit(',').next().unwrap_or(reply))
}

// Channel

pub static ATTENUATION: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("probe_attenuation", "C{ch}:ATTN?", "C{ch}:ATTN {value}")
        .with_validator(Validator::set(PROBE_ATTENUATIONS))
});

pub static BWLIMIT: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("bwlimit", "C{ch}:BWL?", "C{ch}:BWL {value}")
        .with_validator(Validator::set(["OFF", "ON"]))
});

/// The read returns every channel at once (`C1,OFF,C2,ON,...`).
pub static MAUI_BWLIMIT: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("bwlimit", "BWL?", "C{ch}:BWL {value}")
        .with_validator(Validator::set(["OFF", "ON", "200MHZ"]))
});

pub static COUPLING: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("coupling", "C{ch}:CPL?", "C{ch}:CPL {value}").with_mapping([
        ("ac 1M", "A1M"),
        ("dc 1M", "D1M"),
        ("ground", "GND"),
    ])
});

pub static DISPLAY: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("display", "C{ch}:TRA?", "C{ch}:TRA {value}").with_bool_mapping()
});

pub static OFFSET: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("offset", "C{ch}:OFST?", "C{ch}:OFST {value}V")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static SCALE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("scale", "C{ch}:VDIV?", "C{ch}:VDIV {value}V")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static TRIGGER_COUPLING: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("trigger_coupling", "C{ch}:TRCP?", "C{ch}:TRCP {value}")
        .with_mapping([
            ("ac", "AC"),
            ("dc", "DC"),
            ("highpass", "HFREJ"),
            ("lowpass", "LFREJ"),
        ])
});

pub static TRIGGER_LEVEL: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("trigger_level", "C{ch}:TRLV?", "C{ch}:TRLV {value}V")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static TRIGGER_SLOPE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("trigger_slope", "C{ch}:TRSL?", "C{ch}:TRSL {value}").with_mapping([
        ("negative", "NEG"),
        ("positive", "POS"),
        ("window", "WINDOW"),
    ])
});

pub static MAUI_TRIGGER_SLOPE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("trigger_slope", "C{ch}:TRSL?", "C{ch}:TRSL {value}")
        .with_mapping([("negative", "NEG"), ("positive", "POS")])
});

pub static INVERT: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("invert", "C{ch}:INVS?", "C{ch}:INVS {value}").with_bool_mapping()
});

pub static SKEW_FACTOR: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("skew_factor", "C{ch}:SKEW?", "C{ch}:SKEW {value}S")
        .with_validator(Validator::Range {
            min: -1e-7,
            max: 1e-7,
        })
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static TRIGGER_LEVEL2: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("trigger_level2", "C{ch}:TRLV2?", "C{ch}:TRLV2 {value}V")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static UNIT: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("unit", "C{ch}:UNIT?", "C{ch}:UNIT {value}")
        .with_validator(Validator::set(["A", "V"]))
});

pub static MEASURE_PARAMETER: Descriptor = Lazy::new(|| {
    CommandDescriptor::measurement("measure_parameter", "C{ch}:PAVA? {param}")
        .with_preprocess(parameter_reading)
});

pub static CHANNEL_AUTOSCALE: Descriptor =
    Lazy::new(|| CommandDescriptor::setting("autoscale", "C{ch}:AUTO_SETUP FIND"));

pub static SAMPLE_SIZE: Descriptor = Lazy::new(|| {
    CommandDescriptor::measurement("acquisition_sample_size", "SANU? C{ch}")
        .with_preprocess(strip_unit)
});

// Timebase

pub static TIMEBASE_SCALE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("timebase_scale", "TDIV?", "TDIV {value}S")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static TIMEBASE_OFFSET: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("timebase_offset", "TRDL?", "TRDL {value}S")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static TIMEBASE_HOR_MAGNIFY: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("timebase_hor_magnify", "HMAG?", "HMAG {value}S")
        .with_validator(Validator::Range {
            min: 1e-9,
            max: 20e-3,
        })
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static TIMEBASE_HOR_POSITION: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("timebase_hor_position", "HPOS?", "HPOS {value}S")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

// Acquisition

pub static ACQUISITION_TYPE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("acquisition_type", "ACQW?", "ACQW {value}").with_mapping([
        ("normal", "SAMPLING"),
        ("peak", "PEAK_DETECT"),
        ("average", "AVERAGE"),
        ("highres", "HIGH_RES"),
    ])
});

pub static ACQUISITION_AVERAGE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("acquisition_average", "AVGA?", "AVGA {value}")
        .with_validator(Validator::set(AVERAGE_COUNTS))
        .with_format(ValueFormat::Integer)
});

pub static ACQUISITION_STATUS: Descriptor = Lazy::new(|| {
    CommandDescriptor::measurement("acquisition_status", "SAST?").with_mapping([
        ("stopped", "Stop"),
        ("triggered", "Trig'd"),
        ("ready", "Ready"),
        ("auto", "Auto"),
        ("armed", "Arm"),
    ])
});

pub static ACQUISITION_SAMPLING_RATE: Descriptor = Lazy::new(|| {
    CommandDescriptor::measurement("acquisition_sampling_rate", "SARA?").with_preprocess(strip_unit)
});

pub static MEMORY_SIZE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("memory_size", "MSIZ?", "MSIZ {value}").with_mapping(MEMORY_SIZES)
});

/// Free float or string depth (`500`, `100e6`, `"25MA"`); the reply is numeric.
pub static MAUI_MEMORY_SIZE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("memory_size", "MSIZ?", "MSIZ {value}").with_preprocess(strip_unit)
});

// Waveform setup

pub static WAVEFORM_POINTS: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("waveform_points", "WFSU?", "WFSU NP,{value}")
        .with_validator(Validator::Range {
            min: 0.0,
            max: f64::MAX,
        })
        .with_format(ValueFormat::Integer)
        .with_get_process(|v| marker(v, "NP"))
});

pub static WAVEFORM_SPARSING: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("waveform_sparsing", "WFSU?", "WFSU SP,{value}")
        .with_validator(Validator::Range {
            min: 0.0,
            max: f64::MAX,
        })
        .with_format(ValueFormat::Integer)
        .with_get_process(|v| marker(v, "SP"))
});

pub static WAVEFORM_FIRST_POINT: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("waveform_first_point", "WFSU?", "WFSU FP,{value}")
        .with_validator(Validator::Range {
            min: 0.0,
            max: f64::MAX,
        })
        .with_format(ValueFormat::Integer)
        .with_get_process(|v| marker(v, "FP"))
});

// Math

pub static MATH_DEFINE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("math_define", "DEF? EQN", "DEF EQN,'{value}'")
        .with_get_process(math_equation)
});

pub static MATH_VDIV: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("math_vdiv", "MTVD?", "MTVD {value}V")
        .with_format(SCI2)
        .with_preprocess(strip_unit)
});

pub static MATH_VPOS: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("math_vpos", "MTVP?", "MTVP {value}")
        .with_validator(Validator::DiscreteRange {
            min: -255.0,
            max: 255.0,
            step: 1.0,
        })
        .with_format(ValueFormat::Integer)
});

// Instrument control

pub static TRIGGER_MODE: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("trigger_mode", "TRMD?", "TRMD {value}").with_mapping([
        ("auto", "AUTO"),
        ("normal", "NORM"),
        ("single", "SINGLE"),
        ("stop", "STOP"),
    ])
});

pub static ALL_BWLIMIT: Descriptor = Lazy::new(|| {
    CommandDescriptor::control("bwlimit", "BWL?", "BWL {value}")
        .with_validator(Validator::set(["OFF", "ON", "200MHZ"]))
});

pub static AUTOSCALE: Descriptor = Lazy::new(|| CommandDescriptor::setting("autoscale", "ASET"));
pub static STOP: Descriptor = Lazy::new(|| CommandDescriptor::setting("stop", "STOP"));
pub static RESET: Descriptor = Lazy::new(|| CommandDescriptor::setting("reset", "*RST"));
pub static CLEAR_STATUS: Descriptor = Lazy::new(|| CommandDescriptor::setting("clear_status", "*CLS"));
pub static HEADERS_OFF: Descriptor = Lazy::new(|| CommandDescriptor::setting("headers", "CHDR OFF"));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{channel_vars, no_vars};

    #[test]
    fn test_wfsu_markers() {
        let reply = "SP,1,NP,0,FP,0";
        assert_eq!(WAVEFORM_SPARSING.decode(reply).unwrap(), Value::Number(1.0));
        assert_eq!(WAVEFORM_POINTS.decode(reply).unwrap(), Value::Number(0.0));
        assert_eq!(WAVEFORM_FIRST_POINT.decode(reply).unwrap(), Value::Number(0.0));
        assert!(WAVEFORM_POINTS.decode("SP,1").is_err());
        assert_eq!(
            WAVEFORM_POINTS.encode(1000.0.into(), &no_vars()).unwrap(),
            "WFSU NP,1000"
        );
    }

    #[test]
    fn test_math_definition_reply() {
        let value = MATH_DEFINE.decode("EQN,'C1*C3'").unwrap();
        assert_eq!(value, Value::Text("'C1*C3'".into()));
        assert!(matches!(MATH_DEFINE.decode("EQN"), Err(ScopeError::Parse(_))));
        assert_eq!(
            MATH_DEFINE.encode("C1-C2".into(), &no_vars()).unwrap(),
            "DEF EQN,'C1-C2'"
        );
    }

    #[test]
    fn test_memory_size_table() {
        assert_eq!(MEMORY_SIZE.decode("1.4M").unwrap(), Value::Number(14e5));
        assert_eq!(MEMORY_SIZE.encode(7e4.into(), &no_vars()).unwrap(), "MSIZ 70K");
        assert!(MEMORY_SIZE.encode(1e6.into(), &no_vars()).is_err());
        assert_eq!(MAUI_MEMORY_SIZE.decode("2.5E+06").unwrap(), Value::Number(2.5e6));
        assert_eq!(MAUI_MEMORY_SIZE.encode("25MA".into(), &no_vars()).unwrap(), "MSIZ 25MA");
    }

    #[test]
    fn test_status_tokens() {
        assert_eq!(ACQUISITION_STATUS.decode("Trig'd").unwrap(), Value::Text("triggered".into()));
        assert_eq!(ACQUISITION_STATUS.decode("Stop").unwrap(), Value::Text("stopped".into()));
    }

    #[test]
    fn test_channel_templates() {
        let vars = channel_vars(3);
        assert_eq!(SKEW_FACTOR.encode(1e-8.into(), &vars).unwrap(), "C3:SKEW 1.00E-08S");
        assert!(SKEW_FACTOR.encode(2e-7.into(), &vars).is_err());
        assert_eq!(ATTENUATION.encode(10.0.into(), &vars).unwrap(), "C3:ATTN 10");
        assert!(ATTENUATION.encode(3.0.into(), &vars).is_err());
        assert_eq!(MATH_VPOS.encode(12.0.into(), &vars).unwrap(), "MTVP 12");
        assert!(MATH_VPOS.encode(12.5.into(), &vars).is_err());
    }

    #[test]
    fn test_parameter_reading() {
        let mut vars = channel_vars(1);
        vars.insert("param".into(), "RMS".into());
        assert_eq!(MEASURE_PARAMETER.query_command(&vars).unwrap(), "C1:PAVA? RMS");
        assert_eq!(MEASURE_PARAMETER.decode("RMS,1.25E-01V").unwrap(), Value::Number(0.125));
        assert_eq!(MEASURE_PARAMETER.decode("DUTY,50.00%").unwrap(), Value::Number(50.0));
    }

    #[test]
    fn test_maui_slopes_exclude_window() {
        let err = MAUI_TRIGGER_SLOPE
            .encode("window".into(), &channel_vars(1))
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }
}

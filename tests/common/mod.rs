//! Simulated instruments shared by the integration tests.

#![allow(dead_code)]

use teledyne_scope::MockAdapter;

/// A T3DSO1204/HDO6xxx after reset with a probe on channel 1.
pub fn t3dso_instrument() -> MockAdapter {
    let mock = MockAdapter::new()
        .with_register("WFSU", "SP,1,NP,0,FP,0")
        .with_register("MSIZ", "14M")
        .with_register("TDIV", "1.00E-06S")
        .with_register("TRDL", "0.00E+00S")
        .with_register("HMAG", "5.00E-07S")
        .with_register("HPOS", "0.00E+00S")
        .with_register("ACQW", "SAMPLING")
        .with_register("AVGA", "16")
        .with_register("SARA", "1.00E+09Sa/s")
        .with_register("SAST", "Stop")
        .with_register("SANU C1", "1.40E+07pts")
        .with_register("SANU C3", "7.00E+06pts")
        .with_register("MTVD", "1.00E+00V")
        .with_register("MTVP", "0")
        .with_register("DEF", "EQN,'C1+C2'");
    for ch in 1..=4 {
        mock.set_register(&format!("C{ch}:VDIV"), "5.00E-02V");
        mock.set_register(&format!("C{ch}:OFST"), "0.00E+00V");
        mock.set_register(&format!("C{ch}:UNIT"), "V");
    }
    mock
}

/// A MAUI scope; bandwidth limits are reported for all channels at once.
pub fn maui_instrument() -> MockAdapter {
    MockAdapter::new()
        .with_register("WFSU", "SP,1,NP,0,FP,0")
        .with_register("MSIZ", "2.5E+06")
        .with_register("TDIV", "1.00E-06S")
        .with_register("TRDL", "0.00E+00S")
        .with_register("BWL", "C1,OFF,C2,ON,C3,200MHZ,C4,OFF")
        .with_register("C1:VDIV", "5.00E-02 V")
        .with_register("C1:OFST", "0.00E+00 V")
        .with_register("C1:ATTN", "1")
        .with_register("C1:CPL", "D1M")
        .with_register("C1:TRA", "ON")
        .with_register("C1:TRCP", "DC")
        .with_register("C1:TRLV", "0.00E+00 V")
        .with_register("C1:TRSL", "POS")
}

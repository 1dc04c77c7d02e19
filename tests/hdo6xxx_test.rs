mod common;

use teledyne_scope::instrument::{AcquisitionStatus, BandwidthLimit, TriggerSlope};
use teledyne_scope::{ScopeModel, TeledyneOscilloscope, Value};

#[tokio::test(start_paused = true)]
async fn test_channel_auto_setup() {
    let mock = common::t3dso_instrument();
    let scope = TeledyneOscilloscope::hdo6xxx(mock.clone());
    for channel in scope.channels() {
        channel.autoscale().await.unwrap();
    }
    assert_eq!(
        mock.commands(),
        vec![
            "C1:AUTO_SETUP FIND",
            "C2:AUTO_SETUP FIND",
            "C3:AUTO_SETUP FIND",
            "C4:AUTO_SETUP FIND",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_measure_parameter() {
    let mock = common::t3dso_instrument();
    mock.set_register("C2:PAVA FREQ", "FREQ,1.00E+03Hz");
    let scope = TeledyneOscilloscope::hdo6xxx(mock.clone());

    let reading = scope.ch(2).unwrap().measure_parameter("freq").await.unwrap();
    assert_eq!(reading, Value::Number(1000.0));
    assert_eq!(mock.commands(), vec!["C2:PAVA? FREQ"]);
}

#[tokio::test(start_paused = true)]
async fn test_window_slope_and_zoom() {
    let scope = TeledyneOscilloscope::hdo6xxx(common::t3dso_instrument());
    let ch = scope.ch(1).unwrap();
    ch.set_trigger_slope(TriggerSlope::Window).await.unwrap();
    assert_eq!(ch.trigger_slope().await.unwrap(), TriggerSlope::Window);

    let timebase = scope.timebase().await.unwrap();
    assert_eq!(timebase.timebase_hor_magnify, Some(5e-7));
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_readings() {
    let scope = TeledyneOscilloscope::hdo6xxx(common::t3dso_instrument());
    assert_eq!(scope.model(), ScopeModel::Hdo6xxx);
    assert_eq!(scope.acquisition_status().await.unwrap(), AcquisitionStatus::Stopped);
    assert_eq!(scope.acquisition_sampling_rate().await.unwrap(), 1e9);
    assert_eq!(scope.memory_size().await.unwrap(), 14e6);
}

#[tokio::test(start_paused = true)]
async fn test_no_200mhz_limit() {
    let mock = common::t3dso_instrument();
    let scope = TeledyneOscilloscope::hdo6xxx(mock.clone());
    let err = scope.set_bwlimit_all(BandwidthLimit::Mhz200).await.unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(mock.commands().is_empty());
}

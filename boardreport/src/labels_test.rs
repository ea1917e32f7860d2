use crate::labels::{LabelRules, UNKNOWN_BOARD, board_display_name, suite_label_from_artifact};

#[test]
fn suite_label_from_ci_artifact_names() {
    assert_eq!(
        suite_label_from_artifact("PyTest test_report=BFT PyTest Cert_Test; JobAttempt=1"),
        "Cert_Test"
    );
    assert_eq!(
        suite_label_from_artifact(
            "artifacts_PyTest test_report=BFT PyTest Rest_ExtFlashDCINV_Test; JobAttempt=2"
        ),
        "Rest_ExtFlashDCINV_Test"
    );
    assert_eq!(
        suite_label_from_artifact("PyTest test_report=Nightly Smoke; JobAttempt=1"),
        "Nightly Smoke"
    );
    assert_eq!(suite_label_from_artifact("odd name;x=1"), "odd_namex_1");
}

#[test]
fn board_display_names() {
    assert_eq!(board_display_name("BFT_h743zi_dev"), "H743 (STM32H743)");
    assert_eq!(board_display_name("BFT_U575_dev"), "U575 (STM32U575)");
    assert_eq!(board_display_name("BFT_rx65n_dev"), "RX65N");
}

#[test]
fn labels_from_nightly_layout() {
    let rules = LabelRules::default();
    assert_eq!(
        rules.labels_from_components(&[
            "nightly_reports",
            "BFT_h743zi_dev",
            "suite_BLR_Test_IoT_SNTP",
        ]),
        ("BFT_h743zi_dev".to_string(), "BLR_Test_IoT_SNTP".to_string())
    );
}

#[test]
fn labels_from_artifact_directory() {
    let rules = LabelRules::default();
    assert_eq!(
        rules.labels_from_components(&[
            "CFT_u575_dev",
            "PyTest test_report=BFT PyTest Fus_Negative_Test; JobAttempt=1",
        ]),
        ("CFT_u575_dev".to_string(), "Fus_Negative_Test".to_string())
    );
}

#[test]
fn labels_fall_back_to_parent_directory() {
    let rules = LabelRules::default();
    assert_eq!(
        rules.labels_from_components(&["misc", "smoke"]),
        (UNKNOWN_BOARD.to_string(), "smoke".to_string())
    );
}

#[cfg(test)]
mod error_tests {
    use crabfocus::autofocus::AutofocusError;
    use crabfocus::config::ConfigError;
    use crabfocus::errors::HardwareError;
    use crabfocus::quality::ScoreError;
    use crabfocus::types::SearchPhase;
    use std::error::Error;

    #[test]
    fn test_hardware_error_move() {
        let error = HardwareError::MoveError("Stage limit".to_string());
        assert_eq!(error.to_string(), "Axis move error: Stage limit");
    }

    #[test]
    fn test_hardware_error_capture() {
        let error = HardwareError::CaptureError("Capture failed".to_string());
        assert!(error.to_string().contains("Capture error"));
        assert!(error.to_string().contains("Capture failed"));
    }

    #[test]
    fn test_hardware_error_debug_format() {
        let error = HardwareError::SettleError("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("SettleError"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_hardware_error_implements_error_trait() {
        let error = HardwareError::ControlError("Error trait test".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_all_hardware_error_variants() {
        let errors = vec![
            HardwareError::MoveError("a".to_string()),
            HardwareError::SettleError("b".to_string()),
            HardwareError::CaptureError("c".to_string()),
            HardwareError::ControlError("d".to_string()),
            HardwareError::Unsupported("e".to_string()),
        ];
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "Axis move error: a",
                "Axis settle error: b",
                "Capture error: c",
                "Camera control error: d",
                "Unsupported operation: e",
            ]
        );
    }

    #[test]
    fn test_autofocus_error_wraps_hardware_error() {
        let error: AutofocusError = HardwareError::CaptureError("lost frame".to_string()).into();
        assert_eq!(error.to_string(), "Hardware failure: Capture error: lost frame");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_autofocus_error_messages() {
        let error = AutofocusError::NoFocusFound {
            phase: SearchPhase::Fine,
        };
        assert!(error.to_string().contains("fine sweep"));
        assert!(AutofocusError::AlreadyRunning.to_string().contains("already running"));
    }

    #[test]
    fn test_score_error_becomes_invalid_configuration() {
        let error: AutofocusError = ScoreError::InvalidCropFraction(2.0).into();
        assert!(matches!(error, AutofocusError::InvalidConfiguration(_)));
        assert!(error.to_string().contains('2'));
    }

    #[test]
    fn test_config_error_invalid() {
        let error = ConfigError::Invalid("frame size".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: frame size");
    }
}

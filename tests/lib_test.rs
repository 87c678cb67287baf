//! Library integration tests.

use bootstep::BootstepError;

#[test]
fn error_types_are_public() {
    let err = BootstepError::DuplicateStep {
        name: "test".into(),
    };
    assert!(err.to_string().contains("test"));
    assert!(err.is_validation_error());
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> bootstep::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cli_types_are_public() {
    use bootstep::cli::{Cli, Commands};
    use clap::Parser;

    let cli = Cli::parse_from(["bootstep", "graph", "--json"]);

    if let Some(Commands::Graph(args)) = cli.command {
        assert!(args.json);
    } else {
        panic!("Expected Graph command");
    }
}

#[test]
fn step_types_are_public() {
    use bootstep::steps::{CommandStep, FnStep, Step, StepError};

    let command = CommandStep::new("build", "make");
    let closure = FnStep::new("check", |_| async { Ok::<_, StepError>(()) });
    assert_eq!(command.name(), "build");
    assert_eq!(closure.name(), "check");
}

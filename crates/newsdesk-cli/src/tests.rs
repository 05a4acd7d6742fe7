use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["newsdesk", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["newsdesk", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["newsdesk"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn pipeline_run_defaults_to_feeds_and_saving() {
    let cli = Cli::try_parse_from(["newsdesk", "pipeline", "run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Pipeline {
            command: PipelineCommands::Run {
                input: None,
                dry_run: false
            }
        })
    ));
}

#[test]
fn pipeline_run_with_input_file_and_dry_run() {
    let cli = Cli::try_parse_from([
        "newsdesk",
        "pipeline",
        "run",
        "--input",
        "candidates.json",
        "--dry-run",
    ])
    .unwrap();

    let Some(Commands::Pipeline {
        command: PipelineCommands::Run { input, dry_run },
    }) = cli.command
    else {
        panic!("expected pipeline run");
    };
    assert_eq!(input, Some(PathBuf::from("candidates.json")));
    assert!(dry_run);
}

#[test]
fn digest_generate_parses_date_and_skip_flag() {
    let cli = Cli::try_parse_from([
        "newsdesk",
        "digest",
        "generate",
        "--date",
        "2026-10-19",
        "--skip-semantic",
    ])
    .unwrap();

    let Some(Commands::Digest {
        command: DigestCommands::Generate {
            date,
            skip_semantic,
        },
    }) = cli.command
    else {
        panic!("expected digest generate");
    };
    assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 19));
    assert!(skip_semantic);
}

#[test]
fn digest_generate_rejects_malformed_date() {
    let result = Cli::try_parse_from(["newsdesk", "digest", "generate", "--date", "19/10/2026"]);
    assert!(result.is_err());
}

#[test]
fn digest_show_without_date() {
    let cli = Cli::try_parse_from(["newsdesk", "digest", "show"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Digest {
            command: DigestCommands::Show { date: None }
        })
    ));
}

#[test]
fn feedback_rate_parses_id_and_rating() {
    let cli =
        Cli::try_parse_from(["newsdesk", "feedback", "rate", "--id", "42", "--rating", "4"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Feedback {
            command: FeedbackCommands::Rate { id: 42, rating: 4 }
        })
    ));
}

#[test]
fn feedback_rating_out_of_range_is_rejected() {
    for rating in ["0", "6"] {
        let result =
            Cli::try_parse_from(["newsdesk", "feedback", "rate", "--id", "42", "--rating", rating]);
        assert!(result.is_err(), "rating {rating} should be rejected");
    }
}

#[test]
fn feedback_exemplar_parses() {
    let cli = Cli::try_parse_from([
        "newsdesk", "feedback", "exemplar", "--id", "7", "--rating", "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Feedback {
            command: FeedbackCommands::Exemplar { id: 7, rating: 5 }
        })
    ));
}

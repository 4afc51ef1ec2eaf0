use super::*;
use std::path::Path;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }
}

use test_helpers::parse_args;

#[test]
fn no_subcommand_means_chat() {
    let args = parse_args(&["ollachat"]);
    assert_eq!(args.command, None);
    assert_eq!(args.url, None);
    assert_eq!(args.model, None);
}

#[test]
fn global_flags_parse_before_and_after_subcommands() {
    let argv = [
        "ollachat",
        "--url",
        "http://gpu:11434",
        "chat",
        "-m",
        "llama3",
        "--log",
        "chat.log",
    ];
    let args = parse_args(&argv);
    assert_eq!(args.command, Some(Commands::Chat));
    assert_eq!(args.url.as_deref(), Some("http://gpu:11434"));
    assert_eq!(args.model.as_deref(), Some("llama3"));
    assert_eq!(args.log.as_deref(), Some(Path::new("chat.log")));
}

#[test]
fn say_collects_prompt_and_attachments() {
    let args = parse_args(&[
        "ollachat", "say", "-a", "report.csv", "--attach", "cat.png", "--html", "out.html",
        "what", "is", "this?",
    ]);
    assert_eq!(
        args.command,
        Some(Commands::Say {
            prompt: vec!["what".into(), "is".into(), "this?".into()],
            attach: vec!["report.csv".into(), "cat.png".into()],
            html: Some("out.html".into()),
        })
    );
}

#[test]
fn pull_accepts_pasted_command() {
    let args = parse_args(&["ollachat", "pull", "ollama", "pull", "qwen2.5:7b"]);
    let Some(Commands::Pull { name }) = args.command else {
        panic!("expected pull");
    };
    assert_eq!(
        crate::api::models::normalize_pull_name(&name.join(" ")).as_deref(),
        Some("qwen2.5:7b")
    );
}

#[test]
fn pull_requires_a_name() {
    assert!(Args::try_parse_from(["ollachat", "pull"]).is_err());
}

#[test]
fn delete_and_show_flags() {
    assert_eq!(
        parse_args(&["ollachat", "delete", "-y", "old:latest"]).command,
        Some(Commands::Delete {
            name: "old:latest".into(),
            yes: true,
        })
    );
    assert_eq!(
        parse_args(&["ollachat", "show", "--raw", "llama3"]).command,
        Some(Commands::Show {
            name: "llama3".into(),
            raw: true,
        })
    );
}

#[test]
fn set_joins_multi_word_values() {
    let args = parse_args(&["ollachat", "set", "system-prompt", "Answer", "briefly."]);
    assert_eq!(
        args.command,
        Some(Commands::Set {
            key: Some("system-prompt".into()),
            value: vec!["Answer".into(), "briefly.".into()],
        })
    );

    assert_eq!(
        parse_args(&["ollachat", "set"]).command,
        Some(Commands::Set {
            key: None,
            value: Vec::new(),
        })
    );
}

#[test]
fn resolve_client_prefers_flag_over_config() {
    let config = Config {
        base_url: Some("http://configured:11434".into()),
        ..Default::default()
    };
    let client = resolve_client(Some("http://flag:11434/"), &config).unwrap();
    assert_eq!(client.base_url(), "http://flag:11434");

    let client = resolve_client(None, &config).unwrap();
    assert_eq!(client.base_url(), "http://configured:11434");

    let client = resolve_client(None, &Config::default()).unwrap();
    assert_eq!(client.base_url(), "http://localhost:11434");

    assert!(resolve_client(Some("not a url"), &config).is_err());
}

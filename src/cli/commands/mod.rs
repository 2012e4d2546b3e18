use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("hushh-account")
        .about("Hushh account portal client")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Identity API base URL, example: https://id.hushh.ai/auth/v1")
                .env("HUSHH_API_URL")
                .required(true),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .help("Publishable API key sent with every identity request")
                .env("HUSHH_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("account-api-url")
                .long("account-api-url")
                .help("Account API base URL used for the registration lookup")
                .env("HUSHH_ACCOUNT_API_URL")
                .required(true),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .help("Email address to sign in with")
                .required(true),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Account password")
                .env("HUSHH_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("HUSHH_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[macro_use]
extern crate log;

use anyhow::{bail, Context, Result};
use speaker_rs::config::{self, Config};
use speaker_rs::net::TcpWavOutput;
use speaker_rs::sources::espeak::VoiceOptions;
use speaker_rs::sources::tone::Tone;
use speaker_rs::{BeepOptions, PlayOptions, Source, Speaker};

const USAGE: &str = "usage:
  speaker-rs play <file|url> [repeat]
  speaker-rs say <text>
  speaker-rs beep <json phrase|melody name> [tempo]";

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = config::load().await?;

    let output = TcpWavOutput::new(config.output.address.clone());
    let speaker =
        Speaker::with_config(output, config.stream.clone()).with_voice(config.voice.clone());

    tokio::select! {
        result = run(&speaker, &config, &args) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping playback");
            Ok(())
        }
    }
}

async fn run(speaker: &Speaker<TcpWavOutput>, config: &Config, args: &[String]) -> Result<()> {
    let command = args.first().map(String::as_str);

    match command {
        Some("play") => {
            let location = args.get(1).context(USAGE)?;
            let repeat = parse_arg(args.get(2), 1)?;
            let source = Source::parse(location)?;

            speaker
                .play(source, PlayOptions::default().repeat(repeat))
                .await?;
        }
        Some("say") => {
            let text = args[1..].join(" ");
            if text.is_empty() {
                bail!(USAGE);
            }

            speaker.say(&text, 1, &VoiceOptions::default()).await?;
        }
        Some("beep") => {
            let phrase = args.get(1).context(USAGE)?;
            let tones = match config.melodies.get(phrase) {
                Some(melody) => melody.clone(),
                None => serde_json::from_str::<Vec<Tone>>(phrase)
                    .with_context(|| format!("'{phrase}' is neither a melody nor a JSON phrase"))?,
            };
            let tempo = parse_arg(args.get(2), BeepOptions::default().tempo)?;

            let options = BeepOptions {
                tempo,
                ..Default::default()
            };
            speaker.beep(&tones, options).await?;
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn parse_arg<T: std::str::FromStr>(arg: Option<&String>, default: T) -> Result<T> {
    match arg {
        Some(arg) => arg
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid argument '{arg}'\n{USAGE}")),
        None => Ok(default),
    }
}

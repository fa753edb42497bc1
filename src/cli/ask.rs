use std::error::Error as StdError;
use std::io::{self, IsTerminal, Read};

use crate::config::Config;
use crate::die;
use crate::registry::populate::populated_system;
use crate::registry::registry::Settings;
use crate::system::{RequestOptions, Requirements};
use crate::AskArgs;

/// Route one prompt through the model system and print the completion.
pub(crate) async fn ask_cmd(config: &Config, args: &AskArgs) {
    let mut system = populated_system(config).await;

    if let Some(model) = &args.model {
        if let Err(err) = system.set_active_model(model) {
            die!("failed to select model: {}", err);
        }
    }

    let in_terminal = io::stdin().is_terminal();

    if args.prompt.is_some() && !in_terminal {
        die!("it appears that a prompt is being provided both through standard input and the prompt argument");
    }

    // Obtain the prompt, either from a positional argument or standard input.
    let prompt = if let Some(prompt) = &args.prompt {
        prompt.clone()
    } else if !in_terminal {
        let mut buf = String::new();

        io::stdin()
            .read_to_string(&mut buf)
            .expect("failed to read the prompt from standard input");

        buf
    } else {
        die!("no prompt provided, pass one as an argument or on standard input");
    };

    let mut overrides = Settings::new();

    if let Some(temperature) = args.temperature {
        overrides.insert("temperature".to_string(), temperature.into());
    }

    if let Some(max_tokens) = args.max_tokens {
        overrides.insert("max_tokens".to_string(), max_tokens.into());
    }

    let options = RequestOptions {
        overrides,
        requirements: Some(Requirements {
            privacy: args.privacy,
            complexity: args.complexity,
            speed: args.speed,
        }),
    };

    match system.send_request(&prompt, options).await {
        Ok(completion) => {
            if args.json {
                let output = serde_json::to_string_pretty(&completion)
                    .expect("failed to serialize completion");

                println!("{}", output);
            } else {
                println!("{}", completion.response);
            }
        }
        Err(err) => {
            let mut message = format!("{}", err);

            let mut source = err.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {}", cause));
                source = cause.source();
            }

            die!("{}", message);
        }
    }
}

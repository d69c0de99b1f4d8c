//! Generation of an Icinga2 `CheckCommand` definition from the clap command.

use clap::ArgAction;

/// Environment variable that switches the binary into printing its `CheckCommand`.
pub const GENERATE_ENV: &str = "GENERATE_ICINGA_COMMAND";

pub struct CommandDescription {
    arguments: Vec<ArgumentDescription>,
}

pub struct ArgumentDescription {
    name: String,
    value: String,
    description: Option<String>,
    is_flag: bool,
    repeatable: bool,
    required: bool,
    default_value: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToIcingaCommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid executable path")]
    InvalidExecutablePath,
    #[error("error converting to command description: {0}")]
    CommandDescriptionFromError(#[from] CommandDescriptionFromError),
}

impl CommandDescription {
    /// Renders the `object CheckCommand` block pointing at the running executable.
    pub fn to_icinga_command(&self, name: &str) -> Result<String, ToIcingaCommandError> {
        let current_exe = std::env::current_exe()?
            .to_str()
            .ok_or(ToIcingaCommandError::InvalidExecutablePath)?
            .to_owned();

        Ok(self.render(name, &current_exe))
    }

    fn render(&self, name: &str, executable: &str) -> String {
        let mut out = format!("object CheckCommand \"{name}\" {{\n");
        out.push_str(&format!("  command = [ \"{}\" ]\n", escape_string(executable)));
        out.push_str("  arguments = {\n");

        for arg in &self.arguments {
            out.push_str(&format!("    \"--{}\" = {{\n", arg.name));

            if arg.is_flag {
                out.push_str(&format!("      set_if = \"${}$\"\n", arg.value));
            } else {
                out.push_str(&format!("      value = \"${}$\"\n", arg.value));
            }
            if arg.repeatable {
                out.push_str("      repeat_key = true\n");
            }
            if arg.required {
                out.push_str("      required = true\n");
            }
            if let Some(description) = &arg.description {
                out.push_str(&format!(
                    "      description = \"{}\"\n",
                    escape_string(description)
                ));
            }

            out.push_str("    }\n");
        }

        out.push_str("  }\n");

        let defaults: Vec<_> = self
            .arguments
            .iter()
            .filter_map(|arg| arg.default_value.as_ref().map(|d| (&arg.value, d)))
            .collect();
        if !defaults.is_empty() {
            out.push('\n');
        }
        for (value, default_value) in defaults {
            out.push_str(&format!(
                "  vars.{} = \"{}\"\n",
                value,
                escape_string(default_value)
            ));
        }

        out.push_str("}\n");
        out
    }
}

fn escape_string(s: &str) -> String {
    ["\\", "\"", "$"]
        .iter()
        .fold(s.to_string(), |acc, c| acc.replace(c, &format!("\\{}", c)))
}

#[derive(Debug, thiserror::Error)]
pub enum CommandDescriptionFromError {
    #[error("argument '{0}' has no long name")]
    MissingLongArgument(String),
}

impl CommandDescription {
    /// Describes every long option of `cmd`. Help and version options are left out, custom
    /// variables are named `<prefix>_<option>`.
    pub fn from_command(
        cmd: &clap::Command,
        prefix: &str,
    ) -> Result<Self, CommandDescriptionFromError> {
        let mut arguments = Vec::new();

        for arg in cmd.get_arguments() {
            let action = arg.get_action();
            if matches!(
                action,
                ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong | ArgAction::Version
            ) {
                continue;
            }

            let name = arg
                .get_long()
                .ok_or_else(|| {
                    CommandDescriptionFromError::MissingLongArgument(arg.get_id().to_string())
                })?
                .to_owned();

            let value = format!("{}_{}", prefix, name.replace('-', "_"));
            let description = arg.get_help().map(|s| s.to_string());
            let is_flag = matches!(
                action,
                ArgAction::SetTrue | ArgAction::SetFalse | ArgAction::Count
            );

            let default_value = if is_flag {
                None
            } else {
                arg.get_default_values()
                    .first()
                    .and_then(|v| v.to_str())
                    .map(|s| s.to_string())
            };

            arguments.push(ArgumentDescription {
                name,
                value,
                description,
                is_flag,
                repeatable: matches!(action, ArgAction::Append),
                required: arg.is_required_set(),
                default_value,
            });
        }

        Ok(CommandDescription { arguments })
    }
}

/// Print the Icinga command configuration if the GENERATE_ICINGA_COMMAND environment variable is set
/// and exit the process.
pub fn print_icinga_command_config_if_env_and_exit(
    name: &str,
    cmd: &clap::Command,
) -> Result<(), ToIcingaCommandError> {
    if std::env::var_os(GENERATE_ENV).is_none() {
        return Ok(());
    }

    let description = CommandDescription::from_command(cmd, name)?;
    let out = description.to_icinga_command(name)?;

    println!("{}", out.trim());
    std::process::exit(0);
}

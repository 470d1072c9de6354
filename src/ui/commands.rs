use crate::form::ContactSubmission;
use crate::sync::filter::CategoryFilter;

pub const HELP: &str = "comandos: search <texto> | type <all|none|etiqueta> | read | sync | delete <id> | \
submit nombre;cedula;telefono;email;comentario[;etiqueta,...] | reload | help | quit";

const SUBMIT_USAGE: &str = "uso: submit nombre;cedula;telefono;email;comentario[;etiqueta,...]";

/// Actions the operator can take from the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Category(CategoryFilter),
    MarkAllRead,
    Sync,
    Delete(String),
    Submit(ContactSubmission),
    Reload,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, arg.trim()),
            None => (line, ""),
        };
        match word {
            "search" | "s" => Ok(Self::Search(arg.to_string())),
            "type" | "t" => Ok(Self::Category(CategoryFilter::parse(arg))),
            "read" => Ok(Self::MarkAllRead),
            "sync" => Ok(Self::Sync),
            "delete" | "rm" if !arg.is_empty() => Ok(Self::Delete(arg.to_string())),
            "delete" | "rm" => Err("uso: delete <id>".into()),
            "submit" => parse_submission(arg).map(Self::Submit),
            "reload" => Ok(Self::Reload),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            "" => Err("comando vacío".into()),
            other => Err(format!("comando desconocido: {other}")),
        }
    }
}

/// Fields are `;`-separated in form order; tags are `,`-separated.
fn parse_submission(arg: &str) -> Result<ContactSubmission, String> {
    let fields: Vec<&str> = arg.split(';').collect();
    match fields.as_slice() {
        [nombre, cedula, telefono, email, comentario, rest @ ..] if rest.len() <= 1 => {
            let tags: Vec<&str> = rest
                .first()
                .map(|t| t.split(',').map(str::trim).filter(|t| !t.is_empty()).collect())
                .unwrap_or_default();
            Ok(ContactSubmission::new(nombre, cedula, telefono, email, comentario, &tags))
        }
        _ => Err(SUBMIT_USAGE.into()),
    }
}

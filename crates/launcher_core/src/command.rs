use std::borrow::Cow;

use crate::ShellKind;

/// Ctrl-C.
pub const INTERRUPT: &str = "\x03";

/// `cd` into `dir`, terminated with a carriage return like a typed command.
pub fn change_directory(dir: &str) -> String {
    format!("cd {}\r", quote(dir))
}

pub fn launch_server(shell: ShellKind, runtime: &str, args: &[String], entrypoint: &str) -> String {
    let mut line = String::new();
    if shell == ShellKind::PowerShell {
        // PowerShell only runs a quoted path through the call operator.
        line.push_str("& ");
    }
    line.push_str(&quote(runtime));
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line.push(' ');
    line.push_str(&quote(entrypoint));
    line.push('\r');
    line
}

fn quote(value: &str) -> Cow<'_, str> {
    if value.chars().any(char::is_whitespace) {
        Cow::Owned(format!("\"{value}\""))
    } else {
        Cow::Borrowed(value)
    }
}

//! Tolerant argument pre-filter.
//!
//! Deployment scripts pass through whatever flags they were given; anything
//! we do not recognise is dropped here instead of failing the run in clap.

/// Flags that take no value.
const SWITCHES: &[&str] = &["--dry-run", "--no-backup", "-h", "--help", "-V", "--version"];

/// Flags followed by a value, either as the next argument or after `=`.
const VALUED: &[&str] = &["--config"];

/// Split `args` (including the program name) into the arguments clap should
/// see and the ones that were dropped.
pub fn retain_known<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut kept: Vec<String> = args.next().into_iter().collect();
    let mut dropped = Vec::new();

    while let Some(arg) = args.next() {
        if SWITCHES.contains(&arg.as_str()) {
            kept.push(arg);
            continue;
        }
        if VALUED.contains(&arg.as_str()) {
            kept.push(arg);
            if let Some(value) = args.next() {
                kept.push(value);
            }
            continue;
        }
        let valued_inline = arg
            .split_once('=')
            .is_some_and(|(flag, _)| VALUED.contains(&flag));
        if valued_inline {
            kept.push(arg);
        } else {
            dropped.push(arg);
        }
    }
    (kept, dropped)
}

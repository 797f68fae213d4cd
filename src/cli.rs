use std::fmt;

pub const USAGE: &str = "\n\
Usage:\n   \
<name> <amiId>\n\n\
Where:\n   \
name - Value of the Name tag shown in the AWS Console, also used as the hostname (for example, mytest01). \n\n   \
amiId - An Amazon Machine Image (AMI) id that you can obtain from the AWS Console (for example, ami-06018068a18569ff2). \n";

#[derive(Debug, PartialEq, Eq)]
pub struct Args {
    pub name: String,
    pub image_id: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UsageError {
    pub given: usize,
}

impl std::error::Error for UsageError {}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected 2 arguments, got {}", self.given)
    }
}

/// Parses the positional arguments, program name excluded.
pub fn parse_args(args: &[String]) -> Result<Args, UsageError> {
    match args {
        [name, image_id] => Ok(Args {
            name: name.clone(),
            image_id: image_id.clone(),
        }),
        _ => Err(UsageError { given: args.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_parse_two_arguments() {
        let args = parse_args(&owned(&["mytest01", "ami-06018068a18569ff2"])).unwrap();

        assert_eq!(args.name, "mytest01");
        assert_eq!(args.image_id, "ami-06018068a18569ff2");
    }

    #[test]
    fn test_wrong_argument_count_is_usage_error() {
        assert_eq!(parse_args(&owned(&[])), Err(UsageError { given: 0 }));
        assert_eq!(parse_args(&owned(&["mytest01"])), Err(UsageError { given: 1 }));
        assert_eq!(
            parse_args(&owned(&["mytest01", "ami-1", "extra"])),
            Err(UsageError { given: 3 })
        );
    }

    #[test]
    fn test_usage_names_both_arguments() {
        assert!(USAGE.contains("<name> <amiId>"));
        assert!(USAGE.contains("amiId - "));
    }
}

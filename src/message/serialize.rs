use std::fmt;

use super::Message;

/// Cut a field at the first byte that would end or corrupt the line.
fn clean(field: &str) -> &str {
    let end = field.find(['\r', '\n', '\0']).unwrap_or(field.len());
    &field[..end]
}

/// Whether a final middle parameter has to be sent as trailing text.
fn needs_colon(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", clean(prefix))?;
        }
        f.write_str(clean(&self.command))?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let param = clean(param);
            if i == last && self.trailing.is_none() && needs_colon(param) {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }

        if let Some(trailing) = &self.trailing {
            write!(f, " :{}", clean(trailing))?;
        }
        Ok(())
    }
}

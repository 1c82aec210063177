//! Template file name parsing.

/// A page template found in the pages directory.
///
/// The file name is split on `.`: the first segment is the base name, the
/// second is the extension. Anything after the second segment is kept but
/// does not take part in naming the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResource {
    file_name: String,
    base_name: String,
    extension: String,
    extra_segments: Vec<String>,
}

/// Reasons a file name cannot be used as a page template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("missing '.' separator between name and extension")]
    MissingSeparator,

    #[error("file name is not valid UTF-8")]
    NotUtf8,
}

impl TemplateResource {
    /// Parse a template file name such as `index.html` or `about.ejs`.
    pub fn parse(file_name: &str) -> Result<Self, NameError> {
        let mut segments = file_name.split('.');

        let base_name = segments.next().unwrap_or_default();
        let Some(extension) = segments.next() else {
            return Err(NameError::MissingSeparator);
        };

        Ok(Self {
            file_name: file_name.to_string(),
            base_name: base_name.to_string(),
            extension: extension.to_string(),
            extra_segments: segments.map(str::to_string).collect(),
        })
    }

    /// Original file name, extension included.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Text before the first `.`; empty for dotfiles.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Text between the first and second `.`.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Segments after the extension, ignored when naming the output.
    pub fn extra_segments(&self) -> &[String] {
        &self.extra_segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_extension() {
        let resource = TemplateResource::parse("about.html").unwrap();

        assert_eq!(resource.file_name(), "about.html");
        assert_eq!(resource.base_name(), "about");
        assert_eq!(resource.extension(), "html");
        assert!(resource.extra_segments().is_empty());
    }

    #[test]
    fn keeps_only_first_two_segments() {
        let resource = TemplateResource::parse("blog.en.html").unwrap();

        assert_eq!(resource.base_name(), "blog");
        assert_eq!(resource.extension(), "en");
        assert_eq!(resource.extra_segments(), ["html".to_string()]);
    }

    #[test]
    fn accepts_empty_extension() {
        let resource = TemplateResource::parse("contact.").unwrap();

        assert_eq!(resource.base_name(), "contact");
        assert_eq!(resource.extension(), "");
    }

    #[test]
    fn rejects_name_without_separator() {
        assert_eq!(
            TemplateResource::parse("noext"),
            Err(NameError::MissingSeparator)
        );
    }

    #[test]
    fn dotfiles_have_empty_base_name() {
        let resource = TemplateResource::parse(".DS_Store").unwrap();

        assert_eq!(resource.base_name(), "");
        assert_eq!(resource.extension(), "DS_Store");
        assert!(resource.extra_segments().is_empty());
    }
}

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::info;
use propcell::{
    Accessor, Lazy, PropError, PropResult, PropertyDecl, WriteAccessor,
    accessor::{ReadOnly, Stored, TryComputed, rules},
};

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Property(#[from] PropError),
    #[error("logger already installed: {0}")]
    Logger(#[from] log::SetLoggerError),
}

pub type DemoResult<T> = Result<T, DemoError>;

/// Person with fixed-at-birth age and a name derived from its parts.
pub struct Person {
    pub first_name: Stored<String>,
    pub family_name: Stored<String>,
    age: Stored<u32>,
}

impl Person {
    pub fn new(first_name: impl Into<String>, family_name: impl Into<String>, age: u32) -> Self {
        Self {
            first_name: PropertyDecl::new("first_name")
                .initial(first_name.into())
                .rule(rules::non_empty())
                .mutable(),
            family_name: PropertyDecl::new("family_name")
                .initial(family_name.into())
                .rule(rules::non_empty())
                .mutable(),
            age: PropertyDecl::new("age")
                .initial(age)
                .on_read(|name: &str, _: &u32| info!("Accessing {name}"))
                .mutable(),
        }
    }

    /// Recomputed from both name parts on every read, owns no storage.
    pub fn full_name(&self) -> TryComputed<impl Fn() -> PropResult<String> + '_> {
        TryComputed::new("full_name", move || {
            let first = self.first_name.read_ref()?;
            let family = self.family_name.read_ref()?;
            Ok(format!("{first} {family}"))
        })
    }

    pub fn age(&self) -> PropResult<u32> {
        self.age.read()
    }
}

/// Person whose age may be set later, but never to a non-positive number.
pub struct PersonVar {
    pub first_name: Stored<String>,
    pub family_name: String,
    pub age: Stored<Option<i32>>,
}

impl PersonVar {
    pub fn new(first_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            first_name: Stored::new("first_name", first_name.into()),
            family_name: family_name.into(),
            age: PropertyDecl::new("age")
                .initial(None)
                .rule(rules::optional(rules::positive()))
                .mutable(),
        }
    }
}

/// Externally immutable profile. The only way to change it is [`Profile::rename`], which
/// also stamps `last_changed`.
pub struct Profile {
    name: Stored<String>,
    last_changed: Stored<DateTime<Utc>>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: PropertyDecl::new("name")
                .initial(name.into())
                .rule(rules::non_empty())
                .transform(|name: String| name.trim().to_owned())
                .mutable(),
            last_changed: PropertyDecl::new("last_changed")
                .initial(Utc::now())
                .rule(rules::not_decreasing())
                .mutable(),
        }
    }

    pub fn name(&self) -> ReadOnly<&Stored<String>> {
        ReadOnly::new(&self.name)
    }

    pub fn last_changed(&self) -> ReadOnly<&Stored<DateTime<Utc>>> {
        ReadOnly::new(&self.last_changed)
    }

    /// Either both the name and its timestamp change or neither does.
    ///
    /// The wall clock may step backwards, so the new stamp never goes below the previous one
    /// and `last_changed` cannot reject it once the name is accepted.
    pub fn rename(&mut self, name: impl Into<String>) -> PropResult<()> {
        let stamp = Utc::now().max(*self.last_changed.read_ref()?);
        self.name.write(name.into())?;
        self.last_changed.write(stamp)?;
        Ok(())
    }
}

/// Text that is always loaded before use, so it carries no "maybe missing" in its type.
pub struct Content {
    text: Stored<String>,
}

impl Content {
    pub fn new() -> Self {
        Self {
            text: Stored::late("text"),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.text.is_initialized()
    }

    pub fn text(&self) -> PropResult<String> {
        self.text.read()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> DemoResult<()> {
        let text = fs::read_to_string(path)?;
        self.text.write(text).map_err(PropError::from)?;
        Ok(())
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::new()
    }
}

type FileProducer = Box<dyn FnMut() -> io::Result<String> + Send>;

/// A file read from disk on first access only. A failed read is retried on the next access.
pub struct DataFile {
    path: PathBuf,
    text: Lazy<String, io::Error, FileProducer>,
}

impl DataFile {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let source = path.clone();
        let producer: FileProducer = Box::new(move || fs::read_to_string(&source));
        Self {
            path,
            text: Lazy::named("data_file", producer),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.text.is_ready()
    }

    pub fn text(&self) -> PropResult<&str> {
        self.text.accessor().read().map(String::as_str)
    }
}

/// The one application object of the process.
pub struct Application {
    pub name: &'static str,
    pub started_at: DateTime<Utc>,
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

propcell::impl_singleton!(Application => Application {
    name: "My Application",
    started_at: Utc::now(),
});

/// An application named from the command line. Only [`ApplicationFactory`] can build one.
#[derive(Debug)]
pub struct NamedApplication {
    name: String,
}

impl NamedApplication {
    fn new(name: String) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct ApplicationFactory;

impl ApplicationFactory {
    /// Names the application after the first argument, `None` when there is none.
    pub fn create<I>(args: I) -> Option<NamedApplication>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let name = args.into_iter().next()?;
        Some(NamedApplication::new(name.into()))
    }
}

use std::{env, fs};

use propcell::{Accessor, Singleton, WriteAccessor};

mod entities;
mod logger;

use entities::{
    Application, ApplicationFactory, Content, DataFile, DemoResult, Person, PersonVar, Profile,
};

fn main() -> DemoResult<()> {
    logger::init()?;

    let person = Person::new("Mingyu", "Seo", 29);
    println!("{}", person.full_name().read()?);
    println!("age: {}", person.age()?);

    let mut person_var = PersonVar::new("Mingyu", "Seo");
    person_var.age.write(Some(30)).ok();
    print!("{} {}: ", person_var.first_name.read()?, person_var.family_name);
    match person_var.age.write(Some(-4)) {
        Ok(()) => println!("accepted an invalid age"),
        Err(err) => println!("{err} (still {:?})", person_var.age.read()?),
    }

    let mut profile = Profile::new("Mingyu");
    println!("{} changed at {}", profile.name().read()?, profile.last_changed().read()?);
    profile.rename("Minkyu")?;
    println!("{} changed at {}", profile.name().read()?, profile.last_changed().read()?);

    let path = env::temp_dir().join("propcell-demo-data.txt");
    fs::write(&path, "hello from disk")?;

    let mut content = Content::new();
    if let Err(err) = content.text() {
        println!("{err}");
    }
    content.load_file(&path)?;
    println!("content loaded: {}", content.is_loaded());
    println!("content: {}", content.text()?);

    let data = DataFile::open(&path);
    println!("{} loaded: {}", data.path().display(), data.is_loaded());
    println!("data: {}", data.text()?);
    println!("{} loaded: {}", data.path().display(), data.is_loaded());
    fs::remove_file(&path)?;

    let app = Application::instance();
    println!("{app} started at {}", app.started_at);
    match ApplicationFactory::create(env::args().skip(1)) {
        Some(app) => println!("created application '{}'", app.name()),
        None => println!("no application name given"),
    }

    Ok(())
}

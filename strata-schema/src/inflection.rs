//! Identifier inflection used to derive default names.
//!
//! Every default the catalog invents (inverse names, foreign keys, column
//! names, table names) goes through these functions so that derivations stay
//! consistent between the two sides of a relation.

use convert_case::{Case, Casing};

/// Plural form of a word (`comment` -> `comments`).
pub fn pluralize(word: &str) -> String {
    pluralizer::pluralize(word, 2, false)
}

/// Singular form of a word (`comments` -> `comment`).
pub fn singularize(word: &str) -> String {
    pluralizer::pluralize(word, 1, false)
}

/// `camelCase` form of an identifier (`blog_post` -> `blogPost`).
pub fn camel_case(ident: &str) -> String {
    ident.to_case(Case::Camel)
}

/// `snake_case` form of an identifier (`authorId` -> `author_id`).
pub fn snake_case(ident: &str) -> String {
    ident.to_case(Case::Snake)
}

/// `PascalCase` form of an identifier (`blog_post` -> `BlogPost`).
pub fn pascal_case(ident: &str) -> String {
    ident.to_case(Case::Pascal)
}

/// Default foreign key for a relation named `name` (`owner` -> `ownerId`).
pub fn foreign_key_for(name: &str) -> String {
    camel_case(&format!("{name}Id"))
}

mod common;

mod editor;
mod evaluation;

use super::*;

mod emulation;
mod tokens_and_engine;

fn names(list: &[Option<&str>]) -> Vec<Option<String>> {
    list.iter().map(|name| name.map(str::to_string)).collect()
}

fn pieces(list: &[&str]) -> Vec<Option<String>> {
    list.iter().map(|piece| Some((*piece).to_string())).collect()
}

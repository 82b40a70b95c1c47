use super::*;

#[test]
fn exec_searches_from_position() -> Result<()> {
    let digit = Matcher::native(r"\d", "")?;
    let found = exec("a1b2", &digit, 2, false)?.expect("digit after position 2");
    assert_eq!(found.as_str(), "2");
    assert_eq!(found.index(), 3);
    assert_eq!(found.input(), "a1b2");

    assert!(exec("a1b2", &digit, 5, false)?.is_none());
    Ok(())
}

#[test]
fn sticky_exec_only_matches_at_position() -> Result<()> {
    let digit = Matcher::native(r"\d", "")?;
    assert!(exec("a1b2", &digit, 2, true)?.is_none());
    let found = exec("a1b2", &digit, 3, true)?.expect("digit at position 3");
    assert_eq!(found.as_str(), "2");

    let sticky = Matcher::native("a", "y")?;
    assert!(!test("ba", &sticky, 0, false)?);
    assert!(test("ba", &sticky, 1, false)?);
    Ok(())
}

#[test]
fn exec_moves_cursor_of_global_matchers_only() -> Result<()> {
    let engine = Engine::new();
    let global = engine.compile(r"\d+", "g")?;
    exec("ab12cd", &global, 0, false)?;
    assert_eq!(global.last_index(), 4);
    exec("ab12cd", &global, 4, false)?;
    assert_eq!(global.last_index(), 0);

    let local = engine.compile(r"\d+", "")?;
    local.set_last_index(5);
    exec("ab12cd", &local, 0, false)?;
    assert_eq!(local.last_index(), 5);
    Ok(())
}

#[test]
fn nonparticipating_groups_are_absent() -> Result<()> {
    let either = Matcher::native("(a)|(b)", "")?;
    let found = exec("b", &either, 0, false)?.expect("b should match");
    assert_eq!(found.group_count(), 2);
    assert_eq!(found.get(1), None);
    assert_eq!(found.get(2), Some("b"));
    assert_eq!(found.groups().collect::<Vec<_>>(), vec![None, Some("b")]);
    Ok(())
}

#[test]
fn offsets_are_utf8_byte_offsets() -> Result<()> {
    let engine = Engine::new();
    let word = engine.compile(r"(?<w>b+)", "")?;
    let found = exec("ébb", &word, 1, false)?.expect("search rounds up to a char boundary");
    assert_eq!(found.index(), 2);
    assert_eq!(found.range(1), Some(2..4));
    assert!(exec("ébb", &word, 1, true)?.is_none());
    Ok(())
}

#[test]
fn match_scoped_follows_global_flag() -> Result<()> {
    let engine = Engine::new();
    let global = engine.compile(r"\d", "g")?;
    assert_eq!(
        match_scoped("1a2b3", &global, None)?,
        Matched::All(vec!["1".into(), "2".into(), "3".into()])
    );
    assert_eq!(global.last_index(), 0);

    assert_eq!(
        match_scoped("a2b3", &global, Some(MatchScope::One))?,
        Matched::One(Some("2".into()))
    );
    assert_eq!(global.last_index(), 2);

    let local = engine.compile(r"\d", "")?;
    assert_eq!(match_scoped("abc", &local, None)?, Matched::One(None));
    assert_eq!(
        match_scoped("1a2", &local, Some(MatchScope::All))?,
        Matched::All(vec!["1".into(), "2".into()])
    );
    Ok(())
}

#[test]
fn for_each_visits_matches_and_restores_cursor() -> Result<()> {
    let engine = Engine::new();
    let global = engine.compile(r"\d", "g")?;
    let mut seen = Vec::new();
    for_each("1a2b", &global, |found, ordinal, subject, matcher| {
        seen.push((found.as_str().to_string(), ordinal, matcher.last_index()));
        assert_eq!(subject, "1a2b");
        matcher.set_last_index(100);
    })?;
    assert_eq!(seen, vec![("1".to_string(), 0, 1), ("2".to_string(), 1, 3)]);
    assert_eq!(global.last_index(), 0);
    Ok(())
}

#[test]
fn for_each_steps_past_empty_matches() -> Result<()> {
    let empty = Matcher::native("", "g")?;
    let mut starts = Vec::new();
    for_each("ab", &empty, |found, _, _, _| starts.push(found.index()))?;
    assert_eq!(starts, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn sticky_iteration_requires_contiguous_matches() -> Result<()> {
    let engine = Engine::new();
    let sticky = engine.compile(r"\d", "gy")?;
    assert_eq!(
        match_scoped("12a3", &sticky, None)?,
        Matched::All(vec!["1".into(), "2".into()])
    );
    Ok(())
}

#[test]
fn replace_with_named_references() -> Result<()> {
    let engine = Engine::new();
    let name = engine.compile(r"(?<first>\w+) (?<last>\w+)", "")?;
    let swapped = replace(
        "John Smith",
        Search::Regex(&name),
        Replacement::Text("${last}, ${first}"),
        None,
    )?;
    assert_eq!(swapped, "Smith, John");

    let tagged = engine.compile("(?<test>t)", "g")?;
    let out = replace("test", Search::Regex(&tagged), Replacement::Text(":${test}:"), None)?;
    assert_eq!(out, ":t:es:t:");
    Ok(())
}

#[test]
fn replacement_text_special_sequences() -> Result<()> {
    let engine = Engine::new();
    let b = engine.compile("(b)", "")?;
    let cases = [
        ("[$&]", "a[b]c"),
        ("[$`]", "a[a]c"),
        ("[$']", "a[c]c"),
        ("[$$]", "a[$]c"),
        ("[$1]", "a[b]c"),
        ("[$01]", "a[b]c"),
        ("[$10]", "a[b0]c"),
        ("[$0]", "a[$0]c"),
        ("[$00]", "a[$00]c"),
        ("[${0}]", "a[b]c"),
        ("[${1}]", "a[b]c"),
        ("[$x]", "a[$x]c"),
        ("[${]", "a[${]c"),
        ("[$]", "a[$]c"),
    ];
    for (template, expected) in cases {
        let out = replace("abc", Search::Regex(&b), Replacement::Text(template), None)?;
        assert_eq!(out, expected, "template {template}");
    }
    Ok(())
}

#[test]
fn unresolvable_replacement_references_fail() -> Result<()> {
    let engine = Engine::new();
    let b = engine.compile("(b)", "")?;
    for template in ["$2", "${2}", "${nope}"] {
        match replace("abc", Search::Regex(&b), Replacement::Text(template), None) {
            Err(Error::Syntax(_)) => {}
            other => panic!("expected syntax error for {template}, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn nonparticipating_group_expands_to_empty() -> Result<()> {
    let either = Matcher::native("(a)|(b)", "")?;
    let out = replace("b", Search::Regex(&either), Replacement::Text("[$1|$2]"), None)?;
    assert_eq!(out, "[|b]");
    Ok(())
}

#[test]
fn literal_search_is_not_a_pattern() -> Result<()> {
    let once = replace("a.b.c", Search::Literal("."), Replacement::Text("!"), None)?;
    assert_eq!(once, "a!b.c");
    let all = replace(
        "a.b.c",
        ".".into(),
        "[$&]".into(),
        Some(ReplaceScope::All),
    )?;
    assert_eq!(all, "a[.]b[.]c");
    Ok(())
}

#[test]
fn replacement_function_sees_match_and_cursor() -> Result<()> {
    let engine = Engine::new();
    let global = engine.compile(r"\d+", "g")?;
    let cursor = std::cell::Cell::new(Vec::new());
    let out = replace(
        "a1b22",
        Search::Regex(&global),
        Replacement::With(&|found: &Match<'_>| {
            let mut seen = cursor.take();
            seen.push(global.last_index());
            cursor.set(seen);
            let value: u32 = found.as_str().parse().unwrap_or(0);
            (value * 2).to_string()
        }),
        None,
    )?;
    assert_eq!(out, "a2b44");
    assert_eq!(cursor.take(), vec![2, 5]);
    assert_eq!(global.last_index(), 0);
    Ok(())
}

#[test]
fn replace_scope_overrides_global_flag() -> Result<()> {
    let engine = Engine::new();
    let global = engine.compile("a", "g")?;
    let once = replace("aaa", Search::Regex(&global), "b".into(), Some(ReplaceScope::One))?;
    assert_eq!(once, "baa");
    let local = engine.compile("a", "")?;
    let all = replace("aaa", Search::Regex(&local), "b".into(), Some(ReplaceScope::All))?;
    assert_eq!(all, "bbb");
    Ok(())
}

#[test]
fn replace_each_applies_steps_in_order() -> Result<()> {
    let engine = Engine::new();
    let letter = engine.compile("a", "g")?;
    let out = replace_each(
        "abcab",
        &[
            ReplaceStep::new(&letter, "z"),
            ReplaceStep::new("z", "$&$&").scope(ReplaceScope::All),
            ReplaceStep::new("b", "_"),
        ],
    )?;
    assert_eq!(out, "zz_czzb");
    Ok(())
}

#[test]
fn split_handles_optional_and_lazy_separators() -> Result<()> {
    let optional = Matcher::native("-?", "")?;
    assert_eq!(
        split("a--b", Search::Regex(&optional), None)?,
        pieces(&["a", "", "b"])
    );

    let lazy = Matcher::native("-??", "")?;
    assert_eq!(
        split("a--b", Search::Regex(&lazy), None)?,
        pieces(&["a", "-", "-", "b"])
    );
    Ok(())
}

#[test]
fn split_splices_captured_groups() -> Result<()> {
    let digit = Matcher::native(r"(\d)", "")?;
    assert_eq!(
        split("a1b2c", Search::Regex(&digit), None)?,
        pieces(&["a", "1", "b", "2", "c"])
    );

    let optional = Matcher::native(r"(x)?\d", "")?;
    assert_eq!(
        split("a1b", Search::Regex(&optional), None)?,
        vec![Some("a".to_string()), None, Some("b".to_string())]
    );
    Ok(())
}

#[test]
fn split_edge_cases() -> Result<()> {
    assert_eq!(
        split("a,b,c", Search::Literal(","), Some(2))?,
        pieces(&["a", "b"])
    );
    assert_eq!(split("a,b", Search::Literal(","), Some(0))?, Vec::new());
    assert_eq!(split("a.b", Search::Literal("."), None)?, pieces(&["a", "b"]));

    let x = Matcher::native("x", "")?;
    assert_eq!(split("", Search::Regex(&x), None)?, pieces(&[""]));
    let empty = Matcher::native("(?:)", "")?;
    assert_eq!(split("", Search::Regex(&empty), None)?, Vec::new());
    assert_eq!(split("ab", Search::Regex(&empty), None)?, pieces(&["a", "b"]));
    assert_eq!(split("ax", Search::Regex(&x), None)?, pieces(&["a", ""]));
    Ok(())
}

#[test]
fn match_chain_narrows_through_stages() -> Result<()> {
    let engine = Engine::new();
    let bold = engine.compile("<b>.*?</b>", "is")?;
    let digits = Matcher::native(r"\d+", "")?;
    let found = match_chain(
        "1 <b>2</b> 3 <B>4 \n 56</B>",
        &[ChainStage::new(&bold), ChainStage::new(&digits)],
    )?;
    assert_eq!(found, vec!["2", "4", "56"]);
    Ok(())
}

#[test]
fn match_chain_passes_backreferences_on() -> Result<()> {
    let engine = Engine::new();
    let html = "<a href=\"http://example.com/api/\">Example</a>\n\
                <a href=\"http://www.google.com/\">Google</a>";
    let link = engine.compile(r#"<a href="([^"]+)">"#, "i")?;
    let domain = engine.compile(r"(?i)^https?://(?<domain>[^/?#]+)", "")?;
    let found = match_chain(
        html,
        &[
            ChainStage::new(&link).backref(Backref::Index(1)),
            ChainStage::new(&domain).backref(Backref::Name("domain")),
        ],
    )?;
    assert_eq!(found, vec!["example.com", "www.google.com"]);
    Ok(())
}

#[test]
fn match_chain_errors() -> Result<()> {
    let engine = Engine::new();
    let word = engine.compile(r"(\w+)", "")?;
    let err = match_chain("ab", &[ChainStage::new(&word).backref(Backref::Index(2))])
        .expect_err("group 2 does not exist");
    match err {
        Error::Reference(msg) => assert!(msg.contains('2')),
        other => panic!("unexpected error: {other:?}"),
    }

    let err = match_chain("ab", &[ChainStage::new(&word).backref(Backref::Name("nope"))])
        .expect_err("no group called nope");
    assert!(matches!(err, Error::Reference(_)));

    let err = match_chain("ab", &[]).expect_err("empty chain");
    assert!(matches!(err, Error::Type(_)));
    Ok(())
}

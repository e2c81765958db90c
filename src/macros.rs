#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`CardSet`](crate::CardSet) literal. Items default to a count of 1;
/// `=>` overrides the count.
///
/// ```
/// use decktype::card_set;
///
/// let cards = card_set! { "Torch" => 4, "Vara, Fate-Touched" };
/// assert_eq!(cards.count("Torch"), 4);
/// assert_eq!(cards.count("Vara, Fate-Touched"), 1);
/// ```
#[macro_export]
macro_rules! card_set {
    () => {
        $crate::CardSet::new()
    };
    ($($name:expr $(=> $count:expr)?),+ $(,)?) => {{
        let mut set = $crate::CardSet::new();
        $(set.insert($name, Option::<u32>::None $(.or(Some($count)))?.unwrap_or(1));)+
        set
    }};
}

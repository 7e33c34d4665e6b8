extern crate proc_macro;

use proc_macro::{Delimiter, Group, Ident, Literal, Punct, Spacing, Span, TokenStream, TokenTree};

fn chr(ch: char) -> TokenTree {
    TokenTree::Punct(Punct::new(ch, Spacing::Alone))
}
fn j(ch: char) -> TokenTree {
    TokenTree::Punct(Punct::new(ch, Spacing::Joint))
}

fn braced(ts: TokenStream) -> TokenTree {
    TokenTree::Group(Group::new(Delimiter::Brace, ts))
}

macro_rules! tok {
    ($ident:ident) => {
        TokenTree::Ident(Ident::new(stringify!($ident), Span::call_site()))
    };
    (( $($tt:tt)*) ) => {
        TokenTree::Group(Group::new(Delimiter::Parenthesis, TokenStream::from_iter(toks!($($tt)*))))
    };
    ({$($tt:tt)*}) => { $($tt)* };
    (%) => { j(':') };
    (:) => { chr(':') };
    (;) => { chr(';') };
}

macro_rules! toks {
    ($($tt:tt)*) => {
        [$(tok!($tt)),*]
    }
}

fn is_ident(tt: &TokenTree, name: &str) -> bool {
    if let TokenTree::Ident(ident) = tt {
        return ident.to_string() == name;
    }
    false
}

fn compile_error(span: Span, msg: &str) -> TokenStream {
    let mut group = TokenTree::Group(Group::new(
        Delimiter::Parenthesis,
        TokenStream::from_iter([TokenTree::Literal(Literal::string(msg))]),
    ));
    let mut punc = TokenTree::Punct(Punct::new('!', Spacing::Alone));
    punc.set_span(span);
    group.set_span(span);
    TokenStream::from_iter([
        TokenTree::Ident(Ident::new("compile_error", span)),
        punc,
        group,
        TokenTree::Punct(Punct::new(';', Spacing::Alone)),
    ])
}

/// The text to log: a single string literal argument, or the function name.
fn entry_text(attr: TokenStream, name: &Ident) -> Result<TokenTree, TokenStream> {
    let mut attr = attr.into_iter();
    let Some(first) = attr.next() else {
        return Ok(TokenTree::Literal(Literal::string(&name.to_string())));
    };
    let TokenTree::Literal(literal) = &first else {
        return Err(compile_error(first.span(), "expected a string literal"));
    };
    if !literal.to_string().starts_with(['"', 'r']) {
        return Err(compile_error(first.span(), "expected a string literal"));
    }
    if let Some(extra) = attr.next() {
        return Err(compile_error(extra.span(), "expected a single string literal"));
    }
    Ok(first)
}

/// Logs on `chanlog::log()`, under `chanlog::Lock`, each time the function is
/// entered.
///
/// `#[log_fn]` logs the function name, `#[log_fn("text")]` logs `text`.
#[proc_macro_attribute]
pub fn log_fn(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let name = tokens
        .iter()
        .position(|tt| is_ident(tt, "fn"))
        .and_then(|at| match tokens.get(at + 1) {
            Some(TokenTree::Ident(name)) => Some(name.clone()),
            _ => None,
        });
    let Some(name) = name else {
        return compile_error(Span::call_site(), "#[log_fn] expects a function");
    };

    let body = match tokens.pop() {
        Some(TokenTree::Group(group)) if group.delimiter() == Delimiter::Brace => group,
        _ => {
            return compile_error(
                name.span(),
                "#[log_fn] expects a function with a body",
            )
        }
    };

    let text = match entry_text(attr, &name) {
        Ok(text) => text,
        Err(error) => return error,
    };

    let mut out = TokenStream::new();
    out.extend(toks![
        %:chanlog%:__log_fn_entry({text});
    ]);
    out.extend([TokenTree::Group(body)]);

    let mut wrapped = braced(out);
    wrapped.set_span(name.span());
    tokens.push(wrapped);
    TokenStream::from_iter(tokens)
}

//! Attribute macro that declares a function retryable with `rebound`.
//!
//! # Overview
//!
//! `#[retryable]` rewrites a free function or an inherent `&self` method so
//! that every call runs its body under a [`RetryPolicy`](rebound::RetryPolicy)
//! and falls back to a named recovery function once attempts run out. The body
//! becomes the attempt closure driven by
//! [`BlockingRetryable`](rebound::BlockingRetryable) or
//! [`Retryable`](rebound::Retryable), depending on whether it is `async`. On
//! methods it moves into a hidden `__rebound_<name>_inner` sibling first.
//!
//! Arguments are cloned for every attempt, so they must implement `Clone`
//! (references and `Copy` types always do).
//!
//! # Usage
//!
//! ```
//! use rebound_macros::retryable;
//!
//! #[derive(Debug)]
//! struct SendError;
//!
//! fn send_message_callback(_: SendError) -> Result<bool, SendError> {
//!     Ok(false)
//! }
//!
//! #[retryable(
//!     max_attempts = 5,
//!     delay = 1,
//!     multiplier = 2.0,
//!     recover = send_message_callback
//! )]
//! fn send_message(message: &str) -> Result<bool, SendError> {
//!     if message.is_empty() { Err(SendError) } else { Ok(true) }
//! }
//!
//! assert!(send_message("hello world").unwrap());
//! assert!(!send_message("").unwrap());
//! ```
//!
//! # Parameters
//!
//! * `max_attempts = int` – Total attempts, the first included. Defaults to 3.
//! * `delay = int` – Milliseconds before the second attempt. Defaults to 1000.
//! * `multiplier = float` – Delay growth factor, at least 1.0. Defaults to 1.0.
//! * `max_delay = int` – Cap of any single delay, in milliseconds.
//! * `jitter = bool` – Randomly stretch delays.
//! * `when = path` – Predicate selecting retryable errors.
//! * `policy = path` – Function returning a ready-made `RetryPolicy`; excludes
//!   all of the above.
//! * `recover = path` – Recovery called with the last error. On `&self`
//!   methods it is called as `path(self, err)`.
//! * `sleep = path` – Sleeper used between attempts.
//! * `notify = path` – Callback invoked before each wait.
//!
//! # Limitations
//!
//! * Methods that take `&mut self` or own `self` are rejected.
//! * Parameters must bind to identifiers; destructuring patterns are rejected.
#![forbid(unsafe_code)]

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{
    Attribute, Block, Error, FnArg, Ident, ImplItemFn, ItemFn, Lit, LitBool, LitFloat, LitInt, Pat,
    Path, ReturnType, Signature, Token, Type, Visibility,
};

/// Attribute for turning a function into one retried under a `rebound` policy.
#[proc_macro_attribute]
pub fn retryable(args: TokenStream, input: TokenStream) -> TokenStream {
    match expand_retryable(args, input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_retryable(args: TokenStream, input: TokenStream) -> syn::Result<TokenStream> {
    let args = syn::parse2::<RetryableArgs>(proc_macro2::TokenStream::from(args))?;
    args.validate()?;
    let input_tokens = proc_macro2::TokenStream::from(input);

    if let Ok(mut item_fn) = syn::parse2::<ItemFn>(input_tokens.clone()) {
        if item_fn.sig.receiver().is_some() {
            let method = syn::parse2::<ImplItemFn>(input_tokens)?;
            return expand_method(&args, method);
        }
        let block = build_inline_body(&args, &mut item_fn.sig, &item_fn.block)?;
        item_fn.block = Box::new(block);
        return Ok(TokenStream::from(quote!(#item_fn)));
    }

    if let Ok(method) = syn::parse2::<ImplItemFn>(input_tokens) {
        return expand_method(&args, method);
    }

    Err(Error::new(
        proc_macro2::Span::call_site(),
        "#[retryable] may only be applied to free functions or inherent methods",
    ))
}

/// Receiver-less functions keep their body in place; every attempt runs it
/// against fresh clones of the arguments.
fn build_inline_body(
    args: &RetryableArgs,
    sig: &mut Signature,
    body: &Block,
) -> syn::Result<Block> {
    let bindings = collect_arg_bindings(sig)?;
    strip_arg_mutability(sig);

    let rebinds: Vec<proc_macro2::TokenStream> = bindings
        .iter()
        .map(|(pattern, ident)| {
            quote! {
                #[allow(unused_variables)]
                let #pattern = ::core::clone::Clone::clone(&#ident);
            }
        })
        .collect();
    let attempt = if sig.asyncness.is_some() {
        // Ascribing the output lets `?` inside the async block infer its
        // conversion target.
        match &sig.output {
            ReturnType::Type(_, ty) if !matches!(**ty, Type::ImplTrait(_)) => quote!({
                #(#rebinds)*
                async move {
                    let __rebound_output: #ty = #body;
                    __rebound_output
                }
            }),
            _ => quote!({ #(#rebinds)* async move #body }),
        }
    } else {
        quote!({ #(#rebinds)* #body })
    };

    build_function_body(args, sig, attempt, false)
}

/// `&self` methods move their body into a hidden sibling method, which each
/// attempt calls with `self` and fresh clones of the arguments.
fn expand_method(args: &RetryableArgs, method: ImplItemFn) -> syn::Result<TokenStream> {
    if !matches!(method.sig.inputs.first(), Some(FnArg::Receiver(_))) {
        let mut wrapper = method;
        let block = build_inline_body(args, &mut wrapper.sig, &wrapper.block)?;
        wrapper.block = block;
        return Ok(TokenStream::from(quote!(#wrapper)));
    }

    let receiver = match method.sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => receiver,
        _ => {
            return Err(Error::new(
                method.sig.span(),
                "failed to determine method receiver",
            ));
        }
    };

    if let Some(mutability) = receiver.mutability.as_ref() {
        return Err(Error::new(
            mutability.span(),
            "`#[retryable]` does not support methods taking `&mut self`",
        ));
    }
    if receiver.reference.is_none() {
        return Err(Error::new(
            receiver.self_token.span,
            "`#[retryable]` does not support methods that take ownership of `self`",
        ));
    }
    if receiver.colon_token.is_some() {
        return Err(Error::new(
            receiver.span(),
            "`#[retryable]` supports only the `&self` receiver shorthand",
        ));
    }

    let inner_ident = format_ident!("__rebound_{}_inner", method.sig.ident);
    let arg_idents: Vec<Ident> = collect_arg_bindings(&method.sig)?
        .into_iter()
        .map(|(_, ident)| ident)
        .collect();

    let mut inner = method.clone();
    inner.sig.ident = inner_ident.clone();
    inner.vis = Visibility::Inherited;
    inner.attrs = hidden_attrs(&method.attrs);

    let mut wrapper = method;
    strip_arg_mutability(&mut wrapper.sig);
    let call_args = quote!(self #(, ::core::clone::Clone::clone(&#arg_idents))*);
    let attempt = quote!(Self::#inner_ident(#call_args));
    wrapper.block = build_function_body(args, &wrapper.sig, attempt, true)?;

    Ok(TokenStream::from(quote!(#inner #wrapper)))
}

fn hidden_attrs(attrs: &[Attribute]) -> Vec<Attribute> {
    let mut kept: Vec<Attribute> = attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("doc"))
        .cloned()
        .collect();
    kept.push(syn::parse_quote!(#[doc(hidden)]));
    kept
}

fn strip_arg_mutability(sig: &mut Signature) {
    for input in sig.inputs.iter_mut() {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(pat_ident) = &mut *pat_type.pat {
                pat_ident.mutability = None;
            }
        }
    }
}

#[derive(Clone, Default)]
struct RetryableArgs {
    max_attempts: Option<LitInt>,
    delay: Option<LitInt>,
    multiplier: Option<Lit>,
    max_delay: Option<LitInt>,
    jitter: Option<LitBool>,
    when: Option<Path>,
    policy: Option<Path>,
    recover: Option<Path>,
    sleep: Option<Path>,
    notify: Option<Path>,
}

impl Parse for RetryableArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = RetryableArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            let key = ident.to_string();
            input.parse::<Token![=]>()?;

            match key.as_str() {
                "max_attempts" => set_once(&mut args.max_attempts, input.parse()?, &ident)?,
                "delay" => set_once(&mut args.delay, input.parse()?, &ident)?,
                "multiplier" => set_once(&mut args.multiplier, input.parse()?, &ident)?,
                "max_delay" => set_once(&mut args.max_delay, input.parse()?, &ident)?,
                "jitter" => set_once(&mut args.jitter, input.parse()?, &ident)?,
                "when" => set_once(&mut args.when, input.parse()?, &ident)?,
                "policy" => set_once(&mut args.policy, input.parse()?, &ident)?,
                "recover" => set_once(&mut args.recover, input.parse()?, &ident)?,
                "sleep" => set_once(&mut args.sleep, input.parse()?, &ident)?,
                "notify" => set_once(&mut args.notify, input.parse()?, &ident)?,
                other => {
                    return Err(Error::new(
                        ident.span(),
                        format!("unknown parameter `{other}`"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, ident: &Ident) -> syn::Result<()> {
    if slot.is_some() {
        return Err(Error::new(ident.span(), "parameter already specified"));
    }
    *slot = Some(value);
    Ok(())
}

impl RetryableArgs {
    fn has_inline_policy(&self) -> bool {
        self.max_attempts.is_some()
            || self.delay.is_some()
            || self.multiplier.is_some()
            || self.max_delay.is_some()
            || self.jitter.is_some()
            || self.when.is_some()
    }

    /// Reject at compile time what `RetryPolicyBuilder::build` would reject
    /// at run time.
    fn validate(&self) -> syn::Result<()> {
        if let Some(policy) = &self.policy {
            if self.has_inline_policy() {
                return Err(Error::new(
                    policy.span(),
                    "`policy` cannot be combined with `max_attempts`, `delay`, `multiplier`, `max_delay`, `jitter` or `when`",
                ));
            }
        }

        if let Some(lit) = &self.max_attempts {
            if lit.base10_parse::<usize>()? == 0 {
                return Err(Error::new(lit.span(), "`max_attempts` must be at least 1"));
            }
        }

        if let Some(lit) = &self.multiplier {
            let value = match lit {
                Lit::Float(float) => float.base10_parse::<f32>()?,
                Lit::Int(int) => int.base10_parse::<f32>()?,
                other => {
                    return Err(Error::new(other.span(), "`multiplier` must be a number"));
                }
            };
            if value < 1.0 {
                return Err(Error::new(lit.span(), "`multiplier` must be at least 1.0"));
            }
        }

        if let Some(max_delay) = &self.max_delay {
            let delay = match &self.delay {
                Some(lit) => lit.base10_parse::<u64>()?,
                None => 1000,
            };
            if max_delay.base10_parse::<u64>()? < delay {
                return Err(Error::new(
                    max_delay.span(),
                    "`max_delay` must not be shorter than `delay`",
                ));
            }
        }

        Ok(())
    }

    fn policy_tokens(&self) -> proc_macro2::TokenStream {
        if let Some(path) = &self.policy {
            return quote!((#path)());
        }
        if !self.has_inline_policy() {
            return quote!(::rebound::RetryPolicy::default());
        }

        let mut builder = quote!(::rebound::RetryPolicy::builder());
        if let Some(lit) = &self.max_attempts {
            builder = quote!(#builder.max_attempts(#lit));
        }
        if let Some(lit) = &self.delay {
            builder = quote!(#builder.initial_delay(::core::time::Duration::from_millis(#lit)));
        }
        if let Some(lit) = &self.multiplier {
            let value = match lit {
                Lit::Int(int) => {
                    let float = LitFloat::new(&format!("{}.0", int.base10_digits()), int.span());
                    quote!(#float)
                }
                other => quote!(#other),
            };
            builder = quote!(#builder.multiplier(#value));
        }
        if let Some(lit) = &self.max_delay {
            builder = quote!(#builder.max_delay(::core::time::Duration::from_millis(#lit)));
        }
        if let Some(lit) = &self.jitter {
            builder = quote!(#builder.jitter(#lit));
        }
        if let Some(path) = &self.when {
            builder = quote!(#builder.retry_if(#path));
        }

        quote!(match #builder.build() {
            ::core::result::Result::Ok(policy) => policy,
            ::core::result::Result::Err(err) => {
                ::core::panic!("invalid #[retryable] policy: {}", err)
            }
        })
    }
}

fn collect_arg_bindings(sig: &Signature) -> syn::Result<Vec<(syn::PatIdent, Ident)>> {
    let mut out = Vec::new();
    for input in sig.inputs.iter() {
        if let FnArg::Typed(pat_type) = input {
            match &*pat_type.pat {
                Pat::Ident(pat_ident) => out.push((pat_ident.clone(), pat_ident.ident.clone())),
                _ => {
                    return Err(Error::new(
                        pat_type.span(),
                        "parameters must bind to identifiers",
                    ));
                }
            }
        }
    }
    Ok(out)
}

fn build_function_body(
    args: &RetryableArgs,
    sig: &Signature,
    attempt: proc_macro2::TokenStream,
    has_receiver: bool,
) -> syn::Result<Block> {
    let is_async = sig.asyncness.is_some();
    let policy = args.policy_tokens();

    // Naming the closure's return type lets `?` in blocking bodies infer its
    // conversion target.
    let closure = match &sig.output {
        ReturnType::Type(_, ty) if !is_async && !matches!(**ty, Type::ImplTrait(_)) => {
            quote!(|| -> #ty { #attempt })
        }
        _ => quote!(|| #attempt),
    };

    let mut chain = quote! {
        (#closure)
            .retry(&__rebound_policy)
    };

    if let Some(path) = &args.sleep {
        chain = quote!(#chain.sleep(#path));
    }

    if let Some(path) = &args.notify {
        chain = quote!(#chain.notify(#path));
    }

    if let Some(path) = &args.recover {
        chain = if has_receiver {
            quote!(#chain.recover(|__rebound_err| #path(self, __rebound_err)))
        } else {
            quote!(#chain.recover(#path))
        };
    }

    let (trait_use, executed) = if is_async {
        (
            quote!(use ::rebound::Retryable as _;),
            quote!(#chain.await),
        )
    } else {
        (
            quote!(use ::rebound::BlockingRetryable as _;),
            quote!(#chain.call()),
        )
    };

    syn::parse2(quote!({
        #trait_use
        let __rebound_policy = #policy;
        #executed
    }))
}

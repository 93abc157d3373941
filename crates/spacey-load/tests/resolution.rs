// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Name resolution, suffix handling and unit kinds

mod common;

use common::Fixture;
use spacey_load::{
    DenyList, Executor, Extension, LoadContext, LoadError, LoadMode, Loadable, Resolution,
    Result,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn resolve_unit(fx: &Fixture, name: &str) -> spacey_load::ResolvedUnit {
    match fx.service.resolve(name, LoadMode::Require).unwrap() {
        Resolution::Unit(unit) => unit,
        Resolution::AlreadyLoaded => panic!("{} already loaded", name),
    }
}

#[test]
fn test_empty_name_changes_nothing() {
    let fx = Fixture::new();
    let exec = Executor::new();

    assert!(matches!(fx.service.require(&exec, ""), Err(LoadError::NotFound(_))));
    assert!(matches!(fx.service.load(&exec, "", true), Err(LoadError::NotFound(_))));
    assert!(fx.service.loaded_features().is_empty());
    assert!(fx.service.lock_pool().is_empty());
}

#[test]
fn test_missing_name_message() {
    let fx = Fixture::new();
    let err = fx.service.require(&Executor::new(), "nowhere").unwrap_err();
    assert_eq!(err.to_string(), "no such file to load -- nowhere");
}

#[test]
fn test_search_entry_exhausts_suffixes_before_resources() {
    let fx = Fixture::new();
    let libs = fx.root().join("libs");
    fx.write_archive("libs/foo.archive", &[("inner.src", "inner")]);
    fx.write("resources/gems/foo.src", "gem");
    fx.service.resources().add_directory(fx.root().join("resources"));
    fx.service
        .search_path()
        .append(&[libs.display().to_string(), "resource:gems".to_string()]);

    // libs/foo.src misses, libs/foo.archive hits before resource:gems/foo.src
    let unit = resolve_unit(&fx, "foo");
    assert!(matches!(unit.loadable, Loadable::Archive(_)));
    assert!(unit.canonical.ends_with("libs/foo.archive"));

    std::fs::remove_file(libs.join("foo.archive")).unwrap();
    let unit = resolve_unit(&fx, "foo");
    assert!(matches!(unit.loadable, Loadable::Source(_)));
    assert!(unit.canonical.ends_with("resources/gems/foo.src"));
}

#[test]
fn test_search_path_order_and_dedup() {
    let fx = Fixture::new();
    let first = fx.root().join("first");
    let second = fx.root().join("second");
    fx.write("first/dup.src", "first");
    fx.write("second/dup.src", "second");

    let before = fx.service.search_path().len();
    let entries = [second.display().to_string(), first.display().to_string()];
    fx.service.search_path().append(&entries);
    fx.service.search_path().append(&entries);
    assert_eq!(fx.service.search_path().len(), before + 2);

    assert!(fx.service.require(&Executor::new(), "dup").unwrap());
    assert_eq!(fx.runtime.run_order(), vec!["second".to_string()]);
}

#[test]
fn test_standard_dirs_seeded_even_when_missing() {
    let fx = Fixture::with_config(|config| {
        config.prepend_paths = vec!["/opt/first".to_string()];
        config.extra_paths = vec!["/opt/last".to_string()];
    });
    let entries = fx.service.search_path().snapshot();
    let home_lib = fx.root().join("home").join("lib");

    assert_eq!(entries.first().map(String::as_str), Some("/opt/first"));
    assert_eq!(entries.last().map(String::as_str), Some("/opt/last"));
    assert!(entries.contains(&home_lib.join("site").display().to_string()));
    assert!(entries.contains(&home_lib.join("std").display().to_string()));
}

#[test]
fn test_cwd_wins_over_search_path() {
    let fx = Fixture::new();
    fx.write("work/pick.src", "cwd");
    fx.write("lib/pick.src", "lib");
    fx.service
        .search_path()
        .append(&[fx.root().join("lib").display().to_string()]);

    assert!(fx.service.require(&Executor::new(), "pick").unwrap());
    assert_eq!(fx.runtime.run_order(), vec!["cwd".to_string()]);
}

#[test]
fn test_explicit_relative_path_skips_search_path() {
    let fx = Fixture::new();
    fx.write("lib/only_here.src", "lib");
    fx.service
        .search_path()
        .append(&[fx.root().join("lib").display().to_string()]);

    let exec = Executor::new();
    assert!(matches!(
        fx.service.require(&exec, "./only_here"),
        Err(LoadError::NotFound(_))
    ));
    assert!(fx.service.require(&exec, "only_here").unwrap());
}

#[test]
fn test_archive_entry_on_search_path() {
    let fx = Fixture::new();
    let archive = fx.write_archive(
        "bundle.archive",
        &[("lib/util.src", "util"), ("lib/other.src", "other")],
    );
    fx.service
        .search_path()
        .append(&[format!("{}!/lib", archive.display())]);

    let unit = resolve_unit(&fx, "util");
    assert_eq!(
        unit.canonical,
        format!("archive:{}!/lib/util.src", archive.display())
    );

    assert!(fx.service.require(&Executor::new(), "util").unwrap());
    assert_eq!(fx.runtime.runs("util"), 1);
    assert!(fx.service.archives().contains(&archive));
}

#[test]
fn test_archive_locator_request() {
    let fx = Fixture::new();
    let archive = fx.write_archive("pack.archive", &[("a/b.src", "b")]);
    let name = format!("archive:{}!/a/b", archive.display());

    assert!(fx.service.require(&Executor::new(), &name).unwrap());
    assert!(!fx.service.require(&Executor::new(), &name).unwrap());
    assert_eq!(fx.runtime.runs("b"), 1);
}

#[test]
fn test_native_object_is_unsupported() {
    let fx = Fixture::new();
    fx.write("work/native.so", "");

    let err = fx.service.require(&Executor::new(), "native").unwrap_err();
    assert!(matches!(err, LoadError::Unsupported { .. }));
    assert!(err.to_string().contains("are not supported, can't load"));
    assert!(fx.service.lock_pool().is_empty());
}

#[test]
fn test_archive_unit_merges_into_resource_space() {
    let fx = Fixture::new();
    let archive = fx.write_archive("work/kit.archive", &[("kit/tool.src", "tool")]);
    let exec = Executor::new();

    assert!(fx.service.require(&exec, "kit").unwrap());
    assert!(fx.service.resources().has_archive(&archive));

    fx.service.load_resource(&exec, "kit/tool.src", false).unwrap();
    fx.service.load_resource(&exec, "kit/tool.src", false).unwrap();
    assert_eq!(fx.runtime.runs("tool"), 2);
}

#[test]
fn test_resolving_archive_leaves_resource_space_alone() {
    let fx = Fixture::new();
    let archive = fx.write_archive("work/kit.archive", &[("kit/tool.src", "tool")]);

    let unit = resolve_unit(&fx, "kit");
    assert!(matches!(unit.loadable, Loadable::Archive(_)));
    assert!(!fx.service.resources().has_archive(&archive));
}

#[test]
fn test_broken_archive_is_swallowed_only_when_named_explicitly() {
    let fx = Fixture::new();
    // Gzip magic followed by a bad header
    let garbage = [0x1f, 0x8b, b'x', b'y', b'z'];
    std::fs::create_dir_all(fx.work().join("other")).unwrap();
    std::fs::write(fx.work().join("broken.archive"), garbage).unwrap();
    std::fs::write(fx.work().join("other/broken.archive"), garbage).unwrap();
    let exec = Executor::new();

    assert!(fx.service.require(&exec, "broken.archive").unwrap());
    let err = fx.service.require(&exec, "other/broken").unwrap_err();
    assert!(matches!(err, LoadError::LoadFailed { .. }));
    assert!(err.to_string().starts_with("load error: "));
}

struct Counting(Arc<AtomicUsize>);

impl Extension for Counting {
    fn load(&self, _ctx: &LoadContext<'_>) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_extension_fallback() {
    let fx = Fixture::new();
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    fx.service
        .extensions()
        .register("net.HttpClientService", move || {
            Ok(Box::new(Counting(Arc::clone(&counter))) as Box<dyn Extension>)
        });

    let exec = Executor::new();
    assert!(fx.service.require(&exec, "net/http_client").unwrap());
    assert!(!fx.service.require(&exec, "net/http_client").unwrap());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_extension_spellings_share_one_feature() {
    let fx = Fixture::new();
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    fx.service
        .extensions()
        .register("net.HttpClientService", move || {
            Ok(Box::new(Counting(Arc::clone(&counter))) as Box<dyn Extension>)
        });

    let exec = Executor::new();
    assert!(fx.service.require(&exec, "net/http_client").unwrap());
    assert!(!fx.service.require(&exec, "./net/http_client").unwrap());
    assert!(!fx.service.require(&exec, "net//http_client").unwrap());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(
        fx.service.loaded_features(),
        vec!["extension:net.HttpClientService".to_string()]
    );
}

#[test]
fn test_file_spellings_share_one_feature() {
    let fx = Fixture::new();
    let path = fx.write("work/a.src", "a");
    let exec = Executor::new();

    assert_eq!(fx.canonical("a"), fx.canonical("./a.src"));
    assert!(fx.service.require(&exec, "a").unwrap());
    assert!(!fx.service.require(&exec, "./a.src").unwrap());
    assert!(!fx.service.require(&exec, &path.display().to_string()).unwrap());

    assert_eq!(fx.runtime.runs("a"), 1);
    assert_eq!(fx.service.loaded_features().len(), 1);
    assert!(fx.service.lock_pool().is_empty());
}

#[test]
fn test_extension_factory_failure() {
    let fx = Fixture::new();
    fx.service
        .extensions()
        .register("BrokenService", || Err("missing symbol".to_string()));

    let err = fx.service.require(&Executor::new(), "broken").unwrap_err();
    assert_eq!(
        err.to_string(),
        "library 'BrokenService' could not be loaded: missing symbol"
    );
}

struct LoadsBundledResource;

impl Extension for LoadsBundledResource {
    fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        ctx.service()
            .load_resource(ctx.executor(), "tools/helper.src", ctx.isolate())
    }
}

#[test]
fn test_extension_sees_merged_archive() {
    let fx = Fixture::new();
    let archive = fx.write_archive("work/tools.archive", &[("tools/helper.src", "helper")]);
    fx.service
        .extensions()
        .register("ToolsService", || Ok(Box::new(LoadsBundledResource) as Box<dyn Extension>));

    let unit = resolve_unit(&fx, "tools");
    assert!(matches!(unit.loadable, Loadable::Extension(_)));
    assert!(fx.service.resources().has_archive(&archive));

    assert!(fx.service.require(&Executor::new(), "tools").unwrap());
    assert_eq!(fx.runtime.runs("helper"), 1);
}

#[test]
fn test_policy_denial_looks_like_not_found() {
    let fx = Fixture::new();
    fx.write("work/secret.src", "secret");
    let fx = Fixture {
        service: fx.service.with_policy(DenyList::new(["secret"])),
        ..fx
    };

    let exec = Executor::new();
    let err = fx.service.require(&exec, "secret").unwrap_err();
    assert_eq!(err.to_string(), "no such file to load -- secret");
    assert!(matches!(
        fx.service.load(&exec, "secret", false),
        Err(LoadError::NotFound(_))
    ));
    assert_eq!(fx.runtime.runs("secret"), 0);
}

#[test]
fn test_denied_names_from_config() {
    let fx = Fixture::with_config(|config| config.denied = vec!["secret".to_string()]);
    fx.write("work/secret.src", "secret");
    assert!(fx.service.require(&Executor::new(), "secret").is_err());
}

#[test]
fn test_require_short_circuits_on_aliases() {
    let fx = Fixture::new();
    fx.write("work/a.src", "a");
    let exec = Executor::new();

    assert!(fx.service.require(&exec, "a").unwrap());
    assert!(matches!(
        fx.service.resolve("a", LoadMode::Require).unwrap(),
        Resolution::AlreadyLoaded
    ));
    assert!(!fx.service.require(&exec, "a.src").unwrap());
    assert!(fx.service.feature_already_loaded("a.src"));

    // Unregistering the canonical name drops its aliases too.
    let canonical = fx.service.loaded_features().remove(0);
    assert!(fx.service.unregister(&canonical));
    assert!(!fx.service.feature_already_loaded("a.src"));
    assert!(fx.service.require(&exec, "a").unwrap());
    assert_eq!(fx.runtime.runs("a"), 2);
}

#[test]
fn test_load_always_reexecutes() {
    let fx = Fixture::new();
    fx.write("work/a.src", "a");
    let exec = Executor::new();

    fx.service.load(&exec, "a.src", false).unwrap();
    fx.service.load(&exec, "a.src", true).unwrap();
    assert_eq!(fx.runtime.runs("a"), 2);
    assert!(fx.service.loaded_features().is_empty());
    assert!(fx.service.lock_pool().is_empty());
}

#[test]
fn test_load_forwards_isolate_flag() {
    let fx = Fixture::new();
    fx.write("work/iso.src", "iso");
    let seen = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&seen);
    fx.runtime.on("iso", move |ctx| {
        if ctx.isolate() {
            flag.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    });

    let exec = Executor::new();
    fx.service.load(&exec, "iso.src", true).unwrap();
    fx.service.load(&exec, "iso.src", false).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nested_requires_record_load_order() {
    let fx = Fixture::new();
    fx.write("work/outer.src", "outer");
    fx.write("work/inner.src", "inner");
    fx.runtime.on("outer", |ctx| {
        assert!(ctx.require("inner")?);
        Ok(())
    });

    assert!(fx.service.require(&Executor::new(), "outer").unwrap());
    let features = fx.service.loaded_features();
    assert_eq!(features.len(), 2);
    assert!(features[0].ends_with("inner.src"));
    assert!(features[1].ends_with("outer.src"));
}

#[test]
fn test_compiled_unit_goes_to_runtime() {
    let fx = Fixture::new();
    fx.write("work/fast.compiled", "\u{0}\u{1}");

    let err = fx.service.require(&Executor::new(), "fast.compiled").unwrap_err();
    assert!(matches!(err, LoadError::Unsupported { ref kind, .. } if kind == "compiled units"));
}

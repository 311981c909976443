//! Canonical round-trip tests.
//!
//! The printer is canonical, not formatting-preserving, so the invariant
//! under test is: `print(parse(src))` is a fixed point of parse→print,
//! and re-parsing canonical output never fails. These are the
//! parseability guarantees the transform pipeline relies on.

use molt_python_cst::parse_module;

/// Parse, print, re-parse, re-print; both prints must agree and the
/// canonical text must parse.
fn assert_canonical_fixed_point(source: &str) {
    let module = parse_module(source)
        .unwrap_or_else(|e| panic!("initial parse failed for {source:?}: {e}"));
    let first = module.to_source();
    let reparsed = parse_module(&first)
        .unwrap_or_else(|e| panic!("canonical output failed to parse: {e}\n---\n{first}"));
    let second = reparsed.to_source();
    assert_eq!(first, second, "canonical print is not a fixed point");
}

#[test]
fn roundtrip_module_level_statements() {
    assert_canonical_fixed_point(
        "\
import os
import sys as system
from collections import OrderedDict, defaultdict as dd
from . import sibling
from ..pkg.sub import name

CONSTANT = 42
x, y = 1, 2
a = b = 'shared'
total: int = 0
total += 1
del a
assert total, 'must be truthy'
",
    );
}

#[test]
fn roundtrip_functions() {
    assert_canonical_fixed_point(
        "\
@decorator
@ns.wrapped('arg')
def function(pos, /, both, default=1, *rest, kw_only, kw_default=2, **extras) -> str:
    return str(pos)

async def fetch(url, timeout=None):
    async with session.get(url) as response:
        body = await response.read()
    async for chunk in stream:
        process(chunk)
    return body

def generator():
    yield 1
    yield from other()
",
    );
}

#[test]
fn roundtrip_classes() {
    assert_canonical_fixed_point(
        "\
class Base:
    pass

class Derived(Base, metaclass=Meta):
    attribute: int = 0

    def method(self, value):
        self.attribute = value
        return self

    @staticmethod
    def helper():
        return Derived.attribute
",
    );
}

#[test]
fn roundtrip_control_flow() {
    assert_canonical_fixed_point(
        "\
for index, item in enumerate(items):
    if index % 2 == 0:
        continue
    elif item is None:
        break
    else:
        handle(item)
else:
    finish()

while (chunk := stream.read()) != '':
    consume(chunk)

try:
    risky()
except (ValueError, KeyError) as error:
    log(error)
except Exception:
    raise RuntimeError('wrapped') from None
else:
    succeed()
finally:
    cleanup()

with open(path) as handle, lock:
    data = handle.read()
",
    );
}

#[test]
fn roundtrip_expressions() {
    assert_canonical_fixed_point(
        "\
values = [x ** 2 for x in range(10) if x % 2 == 0]
pairs = {k: v for k, v in mapping.items()}
unique = {canonical(name) for name in names}
lazy = (transform(x) for x in source)
nested = [[inner for inner in row] for row in grid]
conditional = left if condition else right
fn = lambda first, second=2: first + second
mixed = f(1, 'two', *args, keyword=3, **kwargs)
sliced = sequence[1:-1:2]
matrix_cell = matrix[row, col]
chained = a < b <= c
combined = not (p and q) or r
bits = (flags | mask) & ~excluded
text = 'adjacent' 'strings'
formatted = f'{value!r:>{width}} and {other}'
",
    );
}

#[test]
fn roundtrip_scope_statements() {
    assert_canonical_fixed_point(
        "\
counter = 0

def outer():
    state = []

    def inner():
        nonlocal state
        global counter
        counter += 1
        state.append(counter)
    return inner
",
    );
}

#[test]
fn roundtrip_semicolons_and_inline_suites() {
    assert_canonical_fixed_point("x = 1; y = 2\nif x: x = 3\nwhile x: break\n");
}

#[test]
fn empty_module_prints_empty() {
    let module = parse_module("").unwrap();
    assert_eq!(module.to_source(), "");
    let module = parse_module("\n\n# only a comment\n").unwrap();
    assert_eq!(module.to_source(), "");
}

#[test]
fn canonical_output_has_no_trailing_blank_lines() {
    let module = parse_module("x = 1\n\n\n").unwrap();
    assert_eq!(module.to_source(), "x = 1\n");
}

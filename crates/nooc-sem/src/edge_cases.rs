//! Edge case and property tests for the typer.

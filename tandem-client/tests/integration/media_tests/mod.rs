mod test_enumeration_failure;
mod test_permission_denied;
mod test_toggle_tracks;

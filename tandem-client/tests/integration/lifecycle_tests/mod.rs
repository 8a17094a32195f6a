mod test_leave_during_negotiation;
mod test_signaling_lost;
